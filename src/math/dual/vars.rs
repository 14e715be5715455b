use std::cell::RefCell;
use std::collections::HashMap;

/// # VarId
/// Small interned handle for an AD variable name (always `fx_<pair>` in this
/// crate). Dual numbers carry `VarId`s rather than `String`s in their
/// gradient/Hessian maps so that cloning and combining duals never touches
/// the heap for the variable keys themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(u32);

struct VarTable {
    names: Vec<String>,
    index: HashMap<String, VarId>,
}

impl VarTable {
    fn new() -> Self {
        VarTable {
            names: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn intern(&mut self, name: &str) -> VarId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = VarId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    fn name(&self, id: VarId) -> &str {
        &self.names[id.0 as usize]
    }
}

thread_local! {
    static TABLE: RefCell<VarTable> = RefCell::new(VarTable::new());
}

/// Intern `name`, returning the stable `VarId` for it (interning the same
/// name twice returns the same id).
pub fn intern(name: &str) -> VarId {
    TABLE.with(|t| t.borrow_mut().intern(name))
}

/// Resolve a `VarId` back to its variable name.
pub fn name_of(id: VarId) -> String {
    TABLE.with(|t| t.borrow().name(id).to_string())
}

/// The canonical AD variable name for an FX pair, e.g. `fx_eurusd`.
pub fn fx_var_name(pair: &str) -> String {
    format!("fx_{pair}")
}
