use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::sync::Mutex;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymId(pub u32);

struct Interner {
    map: FxHashMap<String, u32>, // text -> id
    rev: Vec<String>,            // id -> text
}

impl Interner {
    fn new() -> Self {
        Self { map: FxHashMap::default(), rev: Vec::new() }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.map.get(s) {
            return id;
        }
        let id = self.rev.len() as u32;
        self.rev.push(s.to_owned());
        self.map.insert(self.rev[id as usize].clone(), id);
        id
    }

    fn resolve(&self, id: u32) -> &str {
        &self.rev[id as usize]
    }
}

static INTERNER: Lazy<Mutex<Interner>> = Lazy::new(|| Mutex::new(Interner::new()));

pub fn intern_sym(s: &str) -> SymId {
    SymId(INTERNER.lock().unwrap().intern(s))
}

pub fn sym_to_str(id: SymId) -> String {
    INTERNER.lock().unwrap().resolve(id.0).to_owned()
}
