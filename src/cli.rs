// Copyright 2026 Daniel Pelikan
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

//! Command-line interface. No flag changes session behavior.

use clap::Parser;
use std::path::PathBuf;

/// Default rotating log file.
pub const DEFAULT_LOG_FILE: &str = "./ServerLog.log";

#[derive(Parser, Debug)]
#[command(name = "rfcomm-handoff")]
#[command(about = "Raspberry PI Bluetooth Server")]
#[command(version)]
pub struct Cli {
    /// Log file prefix; daily files are written as <FILE>.YYYY-MM-DD
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_LOG_FILE)]
    pub log: PathBuf,

    /// Diagnostic value, only logged
    #[arg(short, long)]
    pub eff: Option<i32>,

    /// Configuration file (default: <config dir>/rfcomm-handoff/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
