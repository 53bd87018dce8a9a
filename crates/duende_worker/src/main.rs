use duende_worker_lib::{cli::parse_args, commands};

#[tokio::main]
async fn main() {
    let exit_code = commands::run(parse_args()).await;
    std::process::exit(exit_code);
}
