use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::atom::Atom;
use crate::error::{Error, ErrorKind};
use crate::interner::SymId;

/// Memo for scheduler snapshots, keyed by frame identity.
pub type SnapshotMap = FxHashMap<usize, Env>;

struct Frame {
    parent: Option<Env>,
    /// Ordered bindings; a symbol appears at most once per frame.
    bindings: Vec<(SymId, Atom)>,
    /// Script search paths, meaningful on the root frame only.
    paths: Vec<String>,
}

/// A chain of frames supporting lexical scope. Frames are shared: a closure
/// keeps its defining frame alive, and mutation of parent frames from a
/// child is legal.
#[derive(Clone)]
pub struct Env(Arc<Mutex<Frame>>);

impl Env {
    pub fn root() -> Env {
        Env(Arc::new(Mutex::new(Frame {
            parent: None,
            bindings: Vec::new(),
            paths: Vec::new(),
        })))
    }

    pub fn child(parent: &Env) -> Env {
        Env(Arc::new(Mutex::new(Frame {
            parent: Some(parent.clone()),
            bindings: Vec::new(),
            paths: Vec::new(),
        })))
    }

    /// Walks frames innermost to outermost.
    pub fn lookup(&self, sym: SymId) -> Result<Atom, Error> {
        let mut current = self.clone();
        loop {
            let next = {
                let frame = current.0.lock().unwrap();
                if let Some((_, value)) =
                    frame.bindings.iter().find(|(key, _)| *key == sym)
                {
                    return Ok(value.clone());
                }
                frame.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => {
                    return Err(Error::with_node(
                        ErrorKind::Unbound,
                        Atom::Symbol(sym),
                    ));
                }
            }
        }
    }

    /// Binds in this frame, replacing an existing binding for the symbol.
    pub fn define(&self, sym: SymId, value: Atom) {
        let mut frame = self.0.lock().unwrap();
        if let Some(slot) =
            frame.bindings.iter_mut().find(|(key, _)| *key == sym)
        {
            slot.1 = value;
        } else {
            frame.bindings.push((sym, value));
        }
    }

    /// Reassigns the innermost existing binding, walking parents; unbound
    /// symbols are an error (no implicit global create).
    pub fn set(&self, sym: SymId, value: Atom) -> Result<(), Error> {
        let mut current = self.clone();
        loop {
            let next = {
                let mut frame = current.0.lock().unwrap();
                if let Some(slot) =
                    frame.bindings.iter_mut().find(|(key, _)| *key == sym)
                {
                    slot.1 = value;
                    return Ok(());
                }
                frame.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => {
                    return Err(Error::with_node(
                        ErrorKind::Unbound,
                        Atom::Symbol(sym),
                    ));
                }
            }
        }
    }

    /// All bound symbols across the chain, innermost frame first. Shadowed
    /// bindings appear once per frame that holds them.
    pub fn vars(&self) -> Vec<SymId> {
        let mut out = Vec::new();
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let frame = env.0.lock().unwrap();
            out.extend(frame.bindings.iter().map(|(key, _)| *key));
            current = frame.parent.clone();
        }
        out
    }

    fn root_env(&self) -> Env {
        let mut current = self.clone();
        loop {
            let parent = current.0.lock().unwrap().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.root_env().0.lock().unwrap().paths.clone()
    }

    /// Appends a search path unless already present; returns the new count.
    pub fn add_path(&self, path: &str) -> usize {
        let root = self.root_env();
        let mut frame = root.0.lock().unwrap();
        if !frame.paths.iter().any(|p| p == path) {
            frame.paths.push(path.to_string());
        }
        frame.paths.len()
    }

    pub fn clear_paths(&self) -> usize {
        let root = self.root_env();
        let mut frame = root.0.lock().unwrap();
        frame.paths.clear();
        frame.paths.len()
    }

    fn frame_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Clones the whole chain for scheduler dispatch. The memo is shared
    /// with `Atom::snapshot` so a closure bound inside its own captured
    /// frame maps back onto the already-cloned frame instead of recursing
    /// forever.
    pub fn snapshot(&self, seen: &mut SnapshotMap) -> Env {
        if let Some(copy) = seen.get(&self.frame_id()) {
            return copy.clone();
        }
        let (parent, bindings, paths) = {
            let frame = self.0.lock().unwrap();
            (frame.parent.clone(), frame.bindings.clone(), frame.paths.clone())
        };
        // The memo entry must exist before parents or bindings are cloned:
        // closures stored anywhere in the chain may point back at this frame.
        let copy = Env(Arc::new(Mutex::new(Frame {
            parent: None,
            bindings: Vec::new(),
            paths,
        })));
        seen.insert(self.frame_id(), copy.clone());
        let parent_copy = parent.map(|p| p.snapshot(seen));
        copy.0.lock().unwrap().parent = parent_copy;
        for (sym, value) in bindings {
            let cloned = value.snapshot(seen);
            copy.0.lock().unwrap().bindings.push((sym, cloned));
        }
        copy
    }
}
