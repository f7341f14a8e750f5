// Copyright (c) 2026 contributors
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

//! Concurrent HLS and plain-HTTP media acquisition core.
//!
//! [`hls`] parses playlists, selects a variant, and drives the bounded
//! concurrency segment download; [`http_download`] handles the simpler
//! single-resource path. Both land bytes through [`writer::OutputWriter`]
//! and report failures through the single [`error::Error`] taxonomy.

pub mod common;
pub mod error;
pub mod hls;
pub mod http_download;
pub mod remux;
pub mod writer;
