//! Lua 5.4 evaluation backend via the `mlua` crate.
//!
//! Enabled with the `lua` Cargo feature (on by default):
//! ```text
//! cargo build --features lua
//! cargo test  --features lua
//! ```
//!
//! # Scopes
//!
//! | Port operation          | Lua realisation                                   |
//! |-------------------------|---------------------------------------------------|
//! | root scope              | fresh table holding an allowlist of safe globals  |
//! | child scope             | empty table, metatable `{ __index = parent }`     |
//! | evaluate                | chunk loaded with the scope as its `_ENV`         |
//! | bind result             | `name = expression`                               |
//! | seal                    | hollow every reachable table behind a read-only proxy metatable |
//!
//! Global assignments in a chunk always land in the chunk's own `_ENV`, so a
//! child scope never writes into its parent.  Nested tables are shared by
//! reference, which is why the shared scope is sealed before any render.
//! State captured in closure upvalues is outside the seal.  A table whose
//! metatable is protected cannot be sealed, and sealing it fails.

#[cfg(feature = "lua")]
pub use lua_impl::{LuaEngine, LuaScope};

#[cfg(feature = "lua")]
mod lua_impl {
    use std::fmt;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};

    use mlua::prelude::*;
    use mlua::{HookTriggers, VmState};

    use crate::engine::{EvalError, ScriptEngine};
    use crate::value::Value;

    /// Instructions between two budget checks.
    const HOOK_STRIDE: u32 = 1000;

    /// Scope management helpers, loaded once per Lua state.
    const SCOPE_LIB: &str = r#"
local next, ipairs, type, error, tostring, rawset, setmetatable, getmetatable, load =
      next, ipairs, type, error, tostring, rawset, setmetatable, getmetatable, load

local STANDARD = {
  "assert", "error", "ipairs", "next", "pairs", "pcall", "select", "tonumber",
  "tostring", "type", "xpcall", "rawequal", "rawget", "rawlen",
  "getmetatable", "setmetatable", "_VERSION",
}
local LIBRARIES = { "string", "table", "math", "utf8", "coroutine" }

local function copy(t)
  local c = {}
  for k, v in next, t do c[k] = v end
  return c
end

-- Keep scripts away from the string metatable shared by every scope.
getmetatable("").__metatable = "string"

local lib = {}

function lib.new_root(globals)
  local root = {}
  for _, name in ipairs(STANDARD) do root[name] = globals[name] end
  for _, name in ipairs(LIBRARIES) do
    if globals[name] then root[name] = copy(globals[name]) end
  end
  if globals.os then
    root.os = { time = globals.os.time, date = globals.os.date, clock = globals.os.clock }
  end
  root.load = function(chunk, name, mode, env)
    return load(chunk, name, "t", env or root)
  end
  root._G = root
  return root
end

function lib.new_child(parent)
  return setmetatable({}, { __index = parent })
end

local sealed = setmetatable({}, { __mode = "k" })

local function reject(_, key)
  error("attempt to modify sealed binding '" .. tostring(key) .. "'", 2)
end

-- Metamethods are looked up raw, so these fields stay in the table itself.
local function is_event(k)
  return type(k) == "string" and k:sub(1, 2) == "__"
end

local function seal(t)
  if sealed[t] then return end

  local old = getmetatable(t)
  if old ~= nil and type(old) ~= "table" then
    error("cannot seal a table with a protected metatable (" .. tostring(old) .. ")", 0)
  end
  sealed[t] = true

  local backing = {}
  for k, v in next, t do
    if not is_event(k) then backing[k] = v end
  end
  for k in next, backing do rawset(t, k, nil) end

  local mt = {}
  if old then
    for k, v in next, old do mt[k] = v end
    setmetatable(backing, { __index = old.__index })
  end
  mt.__index = backing
  mt.__newindex = reject
  mt.__len = mt.__len or function() return #backing end
  mt.__pairs = mt.__pairs or function() return next, backing, nil end
  mt.__metatable = "sealed"
  setmetatable(t, mt)

  for _, v in next, t do
    if type(v) == "table" then seal(v) end
  end
  for _, v in next, backing do
    if type(v) == "table" then seal(v) end
  end
end

lib.seal = seal

return lib
"#;

    // ── LuaScope ──────────────────────────────────────────────────────────

    /// A scope table inside a [`LuaEngine`]'s state.
    #[derive(Debug, Clone)]
    pub struct LuaScope(LuaTable);

    impl LuaScope {
        /// The underlying table.
        pub fn table(&self) -> &LuaTable {
            &self.0
        }
    }

    // ── LuaEngine ─────────────────────────────────────────────────────────

    /// A Lua 5.4 state acting as the script evaluation port.
    ///
    /// Create one per processor with [`LuaEngine::new`].  Evaluations are
    /// serialized; with an instruction limit set, each call to
    /// [`ScriptEngine::evaluate`] gets its own budget and fails once the
    /// budget is spent.
    pub struct LuaEngine {
        lua: Lua,
        new_root: LuaFunction,
        new_child: LuaFunction,
        seal: LuaFunction,
        tostring: LuaFunction,
        fuel: Arc<AtomicI64>,
        limit: Option<u64>,
        gate: Mutex<()>,
    }

    impl fmt::Debug for LuaEngine {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("LuaEngine")
                .field("limit", &self.limit)
                .finish_non_exhaustive()
        }
    }

    impl LuaEngine {
        /// Create a new Lua state.  `instruction_limit` bounds every single
        /// evaluation; `None` leaves scripts unbounded.
        pub fn new(instruction_limit: Option<u64>) -> Result<Self, EvalError> {
            let lua = Lua::new();
            let fail = |e: LuaError| eval_error("yst.scope", &e);

            let lib: LuaTable = lua.load(SCOPE_LIB).set_name("=yst.scope").eval().map_err(fail)?;
            let new_root: LuaFunction = lib.get("new_root").map_err(fail)?;
            let new_child: LuaFunction = lib.get("new_child").map_err(fail)?;
            let seal: LuaFunction = lib.get("seal").map_err(fail)?;
            let tostring: LuaFunction = lua.globals().get("tostring").map_err(fail)?;

            let fuel = Arc::new(AtomicI64::new(i64::MAX));
            if instruction_limit.is_some() {
                let fuel = Arc::clone(&fuel);
                lua.set_hook(
                    HookTriggers::new().every_nth_instruction(HOOK_STRIDE),
                    move |_, _| {
                        if fuel.fetch_sub(i64::from(HOOK_STRIDE), Ordering::Relaxed) <= 0 {
                            return Err(LuaError::RuntimeError(
                                "instruction limit exceeded".into(),
                            ));
                        }
                        Ok(VmState::Continue)
                    },
                );
            }

            Ok(Self {
                lua,
                new_root,
                new_child,
                seal,
                tostring,
                fuel,
                limit: instruction_limit,
                gate: Mutex::new(()),
            })
        }

        pub fn instruction_limit(&self) -> Option<u64> {
            self.limit
        }

        /// Run `f` alone on this state with a full instruction budget.
        fn guarded<R>(&self, f: impl FnOnce() -> LuaResult<R>) -> LuaResult<R> {
            let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(limit) = self.limit {
                let budget = i64::try_from(limit).unwrap_or(i64::MAX);
                self.fuel.store(budget, Ordering::Relaxed);
            }
            f()
        }

        fn to_value(&self, value: LuaValue) -> LuaResult<Value> {
            Ok(match value {
                LuaValue::Nil => Value::Nil,
                LuaValue::Boolean(b) => Value::Bool(b),
                LuaValue::Integer(n) => Value::Int(n),
                LuaValue::Number(x) => Value::Float(x),
                LuaValue::String(s) => Value::Str(s.to_string_lossy().to_string()),
                other => {
                    let type_name = other.type_name();
                    let repr = self.tostring.call::<String>(other)?;
                    Value::Opaque { type_name, repr }
                }
            })
        }
    }

    fn eval_error(source_name: &str, err: &LuaError) -> EvalError {
        EvalError::new(source_name, err.to_string())
    }

    impl ScriptEngine for LuaEngine {
        type Scope = LuaScope;

        fn create_scope(&self, parent: Option<&LuaScope>) -> Result<LuaScope, EvalError> {
            let table = self
                .guarded(|| match parent {
                    None => self.new_root.call::<LuaTable>(self.lua.globals()),
                    Some(p) => self.new_child.call::<LuaTable>(p.0.clone()),
                })
                .map_err(|e| eval_error("scope", &e))?;
            Ok(LuaScope(table))
        }

        fn evaluate(&self, scope: &LuaScope, source: &str, source_name: &str) -> Result<(), EvalError> {
            self.guarded(|| {
                self.lua
                    .load(source)
                    .set_name(format!("={source_name}"))
                    .set_environment(scope.0.clone())
                    .exec()
            })
            .map_err(|e| eval_error(source_name, &e))
        }

        fn evaluate_binding(
            &self,
            scope: &LuaScope,
            name: &str,
            expression: &str,
            source_name: &str,
        ) -> Result<(), EvalError> {
            self.evaluate(scope, &format!("{name} = {expression}"), source_name)
        }

        fn read_binding(&self, scope: &LuaScope, name: &str) -> Result<Value, EvalError> {
            self.guarded(|| {
                let value: LuaValue = scope.0.get(name)?;
                self.to_value(value)
            })
            .map_err(|e| eval_error(name, &e))
        }

        fn seal(&self, scope: &LuaScope) -> Result<(), EvalError> {
            self.guarded(|| self.seal.call::<()>(scope.0.clone()))
                .map_err(|e| eval_error("seal", &e))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
