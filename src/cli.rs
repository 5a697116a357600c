// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

fn wallet_id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .required(true)
        .value_parser(value_parser!(i64))
        .help("Wallet id")
}

fn amount_arg() -> Arg {
    Arg::new("amount")
        .long("amount")
        .required(true)
        .help("Amount with up to 2 decimal places")
}

pub fn build_cli() -> Command {
    Command::new("pixwallet")
        .about("Digital wallets, Pix key aliases, and async-settled Pix transfers over an immutable ledger")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("wallet")
                .about("Manage wallets and balances")
                .subcommand(
                    Command::new("create").about("Create a wallet with zero balance").arg(
                        Arg::new("user")
                            .long("user")
                            .required(true)
                            .help("Owner user id"),
                    ),
                )
                .subcommand(
                    Command::new("deposit")
                        .about("Deposit into a wallet")
                        .arg(wallet_id_arg())
                        .arg(amount_arg()),
                )
                .subcommand(
                    Command::new("withdraw")
                        .about("Withdraw from a wallet")
                        .arg(wallet_id_arg())
                        .arg(amount_arg()),
                )
                .subcommand(
                    Command::new("balance")
                        .about("Current balance, or the ledger-replayed balance at a timestamp")
                        .arg(wallet_id_arg())
                        .arg(
                            Arg::new("at")
                                .long("at")
                                .help("Timestamp YYYY-MM-DD[ HH:MM:SS]; entries strictly before it count"),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("history")
                        .about("List a wallet's ledger entries")
                        .arg(wallet_id_arg()),
                )),
        )
        .subcommand(
            Command::new("pixkey")
                .about("Register and list Pix keys")
                .subcommand(
                    Command::new("register")
                        .about("Register a Pix key for a wallet")
                        .arg(
                            Arg::new("wallet")
                                .long("wallet")
                                .required(true)
                                .value_parser(value_parser!(i64))
                                .help("Owning wallet id"),
                        )
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .required(true)
                                .help("Key type: CPF, EMAIL, PHONE or EVP"),
                        )
                        .arg(
                            Arg::new("value")
                                .long("value")
                                .required(true)
                                .help("Key value, globally unique"),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list").about("List keys of a wallet").arg(
                        Arg::new("wallet")
                            .long("wallet")
                            .required(true)
                            .value_parser(value_parser!(i64))
                            .help("Wallet id"),
                    ),
                )),
        )
        .subcommand(
            Command::new("transfer")
                .about("Create and inspect Pix transfers")
                .subcommand(
                    Command::new("send")
                        .about("Create a transfer (debits the sender immediately, settles later)")
                        .arg(
                            Arg::new("from")
                                .long("from")
                                .required(true)
                                .value_parser(value_parser!(i64))
                                .help("Source wallet id"),
                        )
                        .arg(
                            Arg::new("key")
                                .long("key")
                                .required(true)
                                .help("Destination Pix key value"),
                        )
                        .arg(amount_arg())
                        .arg(
                            Arg::new("idempotency-key")
                                .long("idempotency-key")
                                .required(true)
                                .help("Caller-supplied token; a reused token is rejected"),
                        ),
                )
                .subcommand(
                    Command::new("show").about("Show a transfer by endToEndId").arg(
                        Arg::new("end-to-end-id")
                            .long("end-to-end-id")
                            .required(true)
                            .help("Transfer endToEndId"),
                    ),
                ),
        )
        .subcommand(
            Command::new("webhook")
                .about("Apply external settlement events")
                .subcommand(
                    Command::new("settle")
                        .about("Apply a CONFIRMED or REJECTED event to a pending transfer")
                        .arg(
                            Arg::new("event-id")
                                .long("event-id")
                                .required(true)
                                .help("Globally unique event id; replays are no-ops"),
                        )
                        .arg(
                            Arg::new("end-to-end-id")
                                .long("end-to-end-id")
                                .required(true)
                                .help("Transfer endToEndId"),
                        )
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .required(true)
                                .help("Event type: CONFIRMED or REJECTED"),
                        ),
                ),
        )
        .subcommand(Command::new("doctor").about("Audit ledger/wallet consistency"))
}
