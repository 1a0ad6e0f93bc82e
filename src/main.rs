#[macro_use]
extern crate clap;
extern crate wallets_lib;

use clap::App;

fn main() {
    let yaml = load_yaml!("cli.yml");
    let mut app = App::from_yaml(yaml);
    let matches = app.clone().get_matches();

    if let Some(_) = matches.subcommand_matches("config") {
        wallets_lib::print_config();
    } else if let Some(_) = matches.subcommand_matches("server") {
        wallets_lib::start_server();
    } else if let Some(_) = matches.subcommand_matches("create_platform_wallets") {
        wallets_lib::create_platform_wallets();
    } else {
        let _ = app.print_help();
        println!("\n")
    }
}
