// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Resource Naming
//!
//! Name generation for runs and version records. Every generated name stays
//! within the platform object-name limit by shortening the variable parts,
//! never the fixed prefix.

use crate::phase::DeploymentStage;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Platform limit on object names, in bytes. All lengths below are bytes.
pub const MAX_OBJECT_NAME_LENGTH: usize = 253;

/// Shortest a name segment is trimmed to before hard truncation kicks in.
pub const MIN_SEGMENT_LENGTH: usize = 10;

/// Width of the random suffix appended to run names.
pub const RUN_SUFFIX_LENGTH: usize = 5;

const EVALUATION_MARKER: &str = "eval";

/// Longest prefix of `s` that fits in `max` bytes without splitting a character.
pub fn truncate_string(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Deterministic part of a task-run name: `"<pre|post>-<definition>-"`.
pub fn task_name_prefix(stage: DeploymentStage, definition: &str) -> String {
    bounded_prefix(stage.as_str(), definition)
}

/// Deterministic part of an evaluation-run name: `"<pre|post>-eval-<definition>-"`.
pub fn evaluation_name_prefix(stage: DeploymentStage, definition: &str) -> String {
    bounded_prefix(&format!("{}-{}", stage.as_str(), EVALUATION_MARKER), definition)
}

/// Task-run name with a fresh random suffix.
pub fn generate_task_name(stage: DeploymentStage, definition: &str) -> String {
    format!("{}{}", task_name_prefix(stage, definition), random_suffix())
}

/// Evaluation-run name with a fresh random suffix.
pub fn generate_evaluation_name(stage: DeploymentStage, definition: &str) -> String {
    format!("{}{}", evaluation_name_prefix(stage, definition), random_suffix())
}

fn bounded_prefix(tag: &str, definition: &str) -> String {
    // tag + '-' + definition + '-' + suffix
    let budget = MAX_OBJECT_NAME_LENGTH.saturating_sub(tag.len() + 2 + RUN_SUFFIX_LENGTH);
    format!("{}-{}-", tag, truncate_string(definition, budget))
}

fn random_suffix() -> String {
    rand::rng().random_range(10_000..100_000u32).to_string()
}

/// Joins `parts` with `-`, shortening the longest parts until the result fits
/// in `max` bytes. Parts are never trimmed below `min`; if that is not
/// enough the joined name is cut at `max`.
pub fn create_resource_name(max: usize, min: usize, parts: &[&str]) -> String {
    let mut segments: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
    loop {
        let joined = segments.join("-");
        let length = joined.len();
        if length <= max {
            return joined;
        }
        let longest = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.len() > min)
            .max_by_key(|(_, s)| s.len())
            .map(|(idx, _)| idx);
        match longest {
            Some(idx) => {
                let current = segments[idx].len();
                let target = current.saturating_sub(length - max).max(min);
                segments[idx] = truncate_string(&segments[idx], target);
            }
            None => return truncate_string(&joined, max),
        }
    }
}

/// Short content hash of a spec generation, used to key version records.
pub fn hash_generation(generation: i64) -> String {
    let digest = Sha256::digest(generation.to_string().as_bytes());
    hex::encode(&digest[..4])
}
