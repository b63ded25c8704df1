use std::net::SocketAddr;

use clap::Parser;

/// REST service exposing ingest, ask and analyze.
#[derive(Debug, Parser)]
#[command(name = "mars-service", version)]
struct Args {
    #[arg(long, env = "MARSRAG_SERVICE_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "MARSRAG_SERVICE_PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let addr: SocketAddr = match format!("{}:{}", args.host, args.port).parse() {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("[marsrag::service] invalid bind address: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = marsrag_lib::run_http_service(addr).await {
        eprintln!("[marsrag::service] service failed: {err:?}");
        std::process::exit(1);
    }
}
