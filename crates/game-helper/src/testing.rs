// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! In-memory game runtime double for tests.

use crate::input::ResolvedInput;
use crate::runtime::{FrameCapture, GameRuntime};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct FakeRuntime {
    frame: Option<FrameCapture>,
    expressions: HashMap<String, String>,
    dispatched: Vec<ResolvedInput>,
    autoload_properties: HashSet<(String, String)>,
    applied: Vec<(String, String, Value)>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_frame(&mut self, width: u32, height: u32, rgba: [u8; 4]) {
        self.frame = Some(FrameCapture {
            width,
            height,
            rgba: rgba
                .iter()
                .copied()
                .cycle()
                .take((width * height * 4) as usize)
                .collect(),
        });
    }

    pub fn stub_expression(&mut self, expression: &str, result: &str) {
        self.expressions
            .insert(expression.to_string(), result.to_string());
    }

    pub fn add_autoload_property(&mut self, autoload: &str, property: &str) {
        self.autoload_properties
            .insert((autoload.to_string(), property.to_string()));
    }

    pub fn dispatched(&self) -> &[ResolvedInput] {
        &self.dispatched
    }

    pub fn applied_overrides(&self) -> Vec<(String, String, Value)> {
        self.applied.clone()
    }
}

impl GameRuntime for FakeRuntime {
    fn capture_frame(&mut self) -> Result<FrameCapture, String> {
        self.frame
            .clone()
            .ok_or_else(|| "no frame rendered yet".to_string())
    }

    fn evaluate(&mut self, expression: &str) -> Result<String, String> {
        self.expressions
            .get(expression)
            .cloned()
            .ok_or_else(|| format!("evaluation failed: {expression}"))
    }

    fn dispatch_input(&mut self, event: ResolvedInput) -> Result<(), String> {
        self.dispatched.push(event);
        Ok(())
    }

    fn apply_override(&mut self, autoload: &str, property: &str, value: &Value) -> bool {
        if !self
            .autoload_properties
            .contains(&(autoload.to_string(), property.to_string()))
        {
            return false;
        }
        self.applied
            .push((autoload.to_string(), property.to_string(), value.clone()));
        true
    }
}
