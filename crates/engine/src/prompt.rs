// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt assembly seam.
//!
//! Deployments plug their own assembler in; the default renders the task
//! attributes and points the agent at the previous attempt's output.

use crate::error::EngineError;
use drover_core::Task;

pub trait PromptAssembler: Send + Sync + 'static {
    fn assemble(&self, task: &Task) -> Result<String, EngineError>;
}

/// Minimal assembler: task header, goal, and prior-output pointer.
#[derive(Default)]
pub struct BasicPromptAssembler;

impl PromptAssembler for BasicPromptAssembler {
    fn assemble(&self, task: &Task) -> Result<String, EngineError> {
        let mut prompt = format!(
            "# Task: {}\n\nType: {} / {}\n\n{}\n",
            task.id, task.kind, task.operation, task.title
        );
        if task.completion_count > 0 {
            prompt.push_str(&format!(
                "\nThis task has completed {} previous attempt(s).\n",
                task.completion_count
            ));
        }
        if let Some(path) = &task.latest_output_path {
            prompt.push_str(&format!("\nOutput of the previous attempt: {path}\n"));
        }
        Ok(prompt)
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
