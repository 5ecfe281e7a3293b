// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::drill::drill;
use crate::cmd::enroll::enroll;
use crate::cmd::serve::serve;
use crate::cmd::stats::StatsFormat;
use crate::cmd::stats::print_deck_stats;
use crate::error::Fallible;
use crate::types::ids::CardRef;
use crate::types::ids::DeckId;
use crate::types::ids::UserId;

const DEFAULT_DB: &str = "progress.sqlite3";

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Serve the study session API over HTTP.
    Serve {
        /// Path to the progress database.
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
        /// The port to use for the web server.
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Optional path to a scheduler configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Study a deck in the terminal.
    Drill {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        deck: DeckId,
        /// Path to the progress database.
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
        /// Optional path to a scheduler configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Create progress records for cards.
    Enroll {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        deck: DeckId,
        /// Path to the progress database.
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
        /// Optional path to a scheduler configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// The cards to enroll.
        #[arg(required = true)]
        cards: Vec<CardRef>,
    },
    /// Print deck statistics.
    Stats {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        deck: DeckId,
        /// Path to the progress database.
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
        /// Output format.
        #[arg(long, default_value_t = StatsFormat::Json)]
        format: StatsFormat,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Serve { db, port, config } => serve(&db, port, config.as_deref()).await,
        Command::Drill {
            user,
            deck,
            db,
            config,
        } => drill(&db, user, deck, config.as_deref()),
        Command::Enroll {
            user,
            deck,
            db,
            config,
            cards,
        } => enroll(&db, &user, &deck, cards, config.as_deref()),
        Command::Stats {
            user,
            deck,
            db,
            format,
        } => print_deck_stats(&db, &user, &deck, format),
    }
}
