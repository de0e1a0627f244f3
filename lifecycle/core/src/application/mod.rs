// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod context;
pub mod engine;

pub mod run_handler;
pub mod task_handler;
pub mod evaluation_handler;
pub mod phase_handler;
pub(crate) mod pipeline;
pub mod app_version_reconciler;
pub mod workload_version_reconciler;
pub mod create_app_version;
pub mod create_workload_version;

// Re-export use cases for convenience
pub use context::EngineContext;
pub use engine::{LifecycleEngine, ReconcileUseCase};
pub use app_version_reconciler::AppVersionReconciler;
pub use workload_version_reconciler::WorkloadVersionReconciler;
pub use create_app_version::AppVersionCreator;
pub use create_workload_version::WorkloadVersionCreator;
pub use phase_handler::{PhaseHandler, PhaseWork};
pub use run_handler::{RunHandler, RunKind};
pub use task_handler::TaskHandler;
pub use evaluation_handler::EvaluationHandler;
