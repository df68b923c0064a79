// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod deployment;
pub mod error;
pub mod launch;
pub mod scrape;
pub mod version;
