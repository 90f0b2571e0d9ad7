//! The pluggable layout script hook.
//!
//! Placement can be delegated to an external Lua function with the contract
//! `layout(inputs, output) -> frames`, where `frames` must be an array of
//! `{origin = {x, y}, size = {width, height}}` with exactly one entry per
//! input, in input order. The VM is sandboxed: no filesystem or process
//! access, a memory ceiling, and an instruction budget. Any contract
//! violation is a fatal [`LayoutError::Script`] - a script bug must be
//! fixed, not retried.

use crate::geometry::Rect;
use crate::types::{LayoutInput, LayoutOutput};
use crate::LayoutError;
use mlua::{HookTriggers, Lua, LuaSerdeExt, Value as LuaValue, VmState};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Instructions between hook invocations.
const HOOK_GRANULARITY: u32 = 1_000;

/// A sandboxed Lua layout function.
pub struct ScriptLayout {
    source: String,
    max_instructions: u64,
    memory_limit: usize,
}

impl ScriptLayout {
    /// Wrap Lua source that defines a global `layout(inputs, output)`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            max_instructions: 10_000_000,
            memory_limit: 64 * 1024 * 1024,
        }
    }

    /// Override the instruction budget.
    pub fn with_instruction_budget(mut self, max_instructions: u64) -> Self {
        self.max_instructions = max_instructions;
        self
    }

    /// Override the memory ceiling in bytes.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Run the script and return one frame per input.
    pub fn frames(
        &self,
        inputs: &[LayoutInput],
        output: &LayoutOutput,
    ) -> Result<Vec<Rect>, LayoutError> {
        let lua = self.sandboxed_vm()?;

        lua.load(self.source.as_str())
            .exec()
            .map_err(|e| LayoutError::Script(format!("failed to load layout script: {e}")))?;

        let layout_fn: mlua::Function = lua
            .globals()
            .get("layout")
            .map_err(|_| LayoutError::Script("script must define layout(inputs, output)".into()))?;

        let lua_inputs = lua
            .to_value(inputs)
            .map_err(|e| LayoutError::Script(format!("failed to marshal inputs: {e}")))?;
        let lua_output = lua
            .to_value(output)
            .map_err(|e| LayoutError::Script(format!("failed to marshal output: {e}")))?;

        let result: LuaValue = layout_fn
            .call((lua_inputs, lua_output))
            .map_err(|e| LayoutError::Script(format!("layout() failed: {e}")))?;

        // Validate through a JSON intermediate rather than poking at the
        // Lua table directly: shape violations become typed errors.
        let json: JsonValue = lua
            .from_value(result)
            .map_err(|e| LayoutError::Script(format!("layout() returned an unusable value: {e}")))?;
        let frames = parse_frames(&json, inputs.len())?;

        debug!(inputs = inputs.len(), "layout script produced frames");
        Ok(frames)
    }

    fn sandboxed_vm(&self) -> Result<Lua, LayoutError> {
        let lua = Lua::new();

        lua.set_memory_limit(self.memory_limit)
            .map_err(|e| LayoutError::Script(format!("failed to set memory limit: {e}")))?;

        // The hook closure is Fn, so the counter lives in a Cell.
        let budget = self.max_instructions;
        let executed = std::cell::Cell::new(0u64);
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_GRANULARITY),
            move |_lua, _debug| {
                executed.set(executed.get() + u64::from(HOOK_GRANULARITY));
                if executed.get() > budget {
                    Err(mlua::Error::RuntimeError(
                        "layout script exceeded its instruction budget".to_string(),
                    ))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );

        remove_dangerous_globals(&lua)
            .map_err(|e| LayoutError::Script(format!("failed to sandbox VM: {e}")))?;
        Ok(lua)
    }
}

/// Remove globals that could reach the host.
fn remove_dangerous_globals(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    // Filesystem and dynamic code loading
    globals.set("dofile", LuaValue::Nil)?;
    globals.set("loadfile", LuaValue::Nil)?;
    globals.set("io", LuaValue::Nil)?;

    // Process control; keep the pure os functions (clock, date, time)
    let os_table: mlua::Table = globals.get("os")?;
    os_table.set("execute", LuaValue::Nil)?;
    os_table.set("exit", LuaValue::Nil)?;
    os_table.set("remove", LuaValue::Nil)?;
    os_table.set("rename", LuaValue::Nil)?;
    os_table.set("setenv", LuaValue::Nil)?;
    os_table.set("setlocale", LuaValue::Nil)?;
    os_table.set("tmpname", LuaValue::Nil)?;

    globals.set("debug", LuaValue::Nil)?;

    Ok(())
}

/// Check the returned value against the expected frame-array schema.
fn parse_frames(value: &JsonValue, expected: usize) -> Result<Vec<Rect>, LayoutError> {
    let array = value.as_array().ok_or_else(|| {
        LayoutError::Script("layout() must return an array of frames".to_string())
    })?;
    if array.len() != expected {
        return Err(LayoutError::Script(format!(
            "layout() returned {} frames for {} inputs",
            array.len(),
            expected
        )));
    }

    array
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let x = frame_number(frame, "origin", "x", i)?;
            let y = frame_number(frame, "origin", "y", i)?;
            let width = frame_number(frame, "size", "width", i)?;
            let height = frame_number(frame, "size", "height", i)?;
            if width < 0 || height < 0 {
                return Err(LayoutError::Script(format!(
                    "frame {i} has a negative size"
                )));
            }
            Ok(Rect::new(x, y, width as u32, height as u32))
        })
        .collect()
}

fn frame_number(frame: &JsonValue, group: &str, field: &str, index: usize) -> Result<i64, LayoutError> {
    frame
        .get(group)
        .and_then(|g| g.get(field))
        .and_then(|v| v.as_f64())
        .map(|v| v.round() as i64)
        .ok_or_else(|| {
            LayoutError::Script(format!("frame {index} is missing {group}.{field}"))
        })
}
