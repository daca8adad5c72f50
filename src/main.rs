mod cli;
mod commands;
mod env_loader;
mod error;
mod zib;

fn main() {
    env_loader::load_dotenv();

    match cli::run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            match error::domain_error(&err) {
                Some(domain) => eprintln!("error[{}]: {err:#}", domain.code().as_str()),
                None => eprintln!("error: {err:#}"),
            }
            std::process::exit(1);
        }
    }
}
