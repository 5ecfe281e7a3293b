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

use crate::db::SqliteRepository;
use crate::error::ErrorReport;
use crate::error::Fallible;

pub mod drill;
pub mod enroll;
pub mod serve;
pub mod stats;

fn open_repository(path: &Path) -> Fallible<SqliteRepository> {
    let path = path.to_str().ok_or_else(|| ErrorReport::new("invalid path"))?;
    SqliteRepository::open(path)
}
