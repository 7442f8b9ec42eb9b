use std::io::Write;

const BLUE: &str = "\x1b[94m";
const RESET: &str = "\x1b[0m";

fn main() {
    env_logger::Builder::new()
        .format(|buf, record| {
            if record.level() == log::Level::Error {
                writeln!(buf, "{}Error:{} {}", BLUE, RESET, record.args())
            } else {
                writeln!(buf, "{}", record.args())
            }
        })
        .filter(None, log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = copiar::run() {
        eprintln!("{}Error:{} {}", BLUE, RESET, e);
        std::process::exit(1);
    }
}
