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

use std::path::Path;
use std::sync::Arc;

use crate::api::server::start_server;
use crate::api::state::ServerState;
use crate::clock::SystemClock;
use crate::cmd::open_repository;
use crate::config::SchedulerConfig;
use crate::error::Fallible;

pub async fn serve(db_path: &Path, port: u16, config_path: Option<&Path>) -> Fallible<()> {
    let config = SchedulerConfig::load(config_path)?;
    let repo = open_repository(db_path)?;
    log::debug!("Serving progress database {}", db_path.display());
    let state = ServerState::new(Arc::new(repo), Arc::new(SystemClock), config);
    start_server(state, port).await
}
