use dkimsign::{
    signer::{Expiration, OutputFormat},
    SignRequestBuilder, SigningKey,
};
use std::{env, num::NonZeroUsize, process, time::Duration};
use tokio::{
    fs,
    io::{self, AsyncReadExt, AsyncWriteExt},
};

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut args = env::args();

    let (key_file, domain, selector) = match (
        args.next().as_deref(),
        args.next(),
        args.next(),
        args.next(),
        args.next(),
    ) {
        (_, Some(key_file), Some(domain), Some(selector), None) => (key_file, domain, selector),
        (program, ..) => {
            eprintln!("usage: {} <key_file> <domain> <selector>", program.unwrap_or("dkimsign"));
            process::exit(1);
        }
    };

    let key_file = fs::read_to_string(key_file).await.unwrap();
    let signing_key = SigningKey::from_pem(&key_file).unwrap();

    let defaults = SignRequestBuilder::new()
        .expiration(Expiration::After(Duration::from_secs(60 * 60 * 24 * 5)))
        .format(OutputFormat {
            line_width: NonZeroUsize::new(78),
            ..Default::default()
        });

    let request = defaults
        .overlay(
            SignRequestBuilder::new()
                .domain(domain)
                .selector(selector)
                .signing_key(signing_key),
        )
        .build()
        .unwrap_or_else(|e| {
            eprintln!("invalid configuration: {e}");
            process::exit(1);
        });

    let mut msg = String::new();
    let n = io::stdin().read_to_string(&mut msg).await.unwrap();
    assert!(n > 0, "empty message on stdin");

    match dkimsign::sign(&request, &msg) {
        Ok(signed) => {
            let signed = signed.replace("\r\n", "\n");
            io::stdout().write_all(signed.as_bytes()).await.unwrap();
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            process::exit(1);
        }
    }
}
