// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod cache;
pub mod enrichment;
pub mod extractor;
pub mod logging;
pub mod orchestrator;
pub mod policy;
pub mod proxy;
pub mod quiescence;
pub mod renderer;
pub mod runtime;
pub mod single_flight;
