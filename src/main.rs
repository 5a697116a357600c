// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use pixwallet::{cli, commands, db};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("wallet", sub)) => commands::wallets::handle(&mut conn, sub)?,
        Some(("pixkey", sub)) => commands::keys::handle(&mut conn, sub)?,
        Some(("transfer", sub)) => commands::transfer::handle(&mut conn, sub)?,
        Some(("webhook", sub)) => commands::webhook::handle(&mut conn, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
