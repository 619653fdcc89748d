//! Atomic unit resolution inside fenced code.
//!
//! Declaration detection is an indentation + keyword heuristic, not a parser.
//! Fences in languages without declaration patterns (or without a tag at all)
//! resolve to a single unit spanning the whole body.

use crate::block::CodeFence;
use crate::language::{DeclKind, Declaration, Language};

/// Label of a non-splittable span of fence text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    /// Lines before the first declaration (or the whole fence)
    Preamble,
    /// Top-level function definition
    FunctionDef { name: String },
    /// Top-level class-like definition (class, struct, trait, impl, interface)
    ClassDef { name: String },
    /// Top-level code following a declaration
    Trailer,
}

/// A labeled span `[start, end)` of a fence's text, in bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicUnit {
    pub kind: UnitKind,
    pub start: usize,
    pub end: usize,
    /// Declarations nested inside this unit (methods, inner functions)
    pub nested: Vec<Declaration>,
}

impl AtomicUnit {
    fn new(kind: UnitKind, start: usize) -> Self {
        Self {
            kind,
            start,
            end: start,
            nested: Vec::new(),
        }
    }

    /// Declared name for function/class units
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::FunctionDef { name } | UnitKind::ClassDef { name } => Some(name),
            UnitKind::Preamble | UnitKind::Trailer => None,
        }
    }

    #[must_use]
    pub const fn is_declaration(&self) -> bool {
        matches!(
            self.kind,
            UnitKind::FunctionDef { .. } | UnitKind::ClassDef { .. }
        )
    }

    /// Check if this unit's span intersects `[start, end)`
    #[must_use]
    pub const fn intersects(&self, start: usize, end: usize) -> bool {
        if self.start == self.end {
            return start <= self.start && self.start <= end;
        }
        self.start < end && start < self.end
    }

    /// Function names declared by this unit, including nested ones
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        let own = match &self.kind {
            UnitKind::FunctionDef { name } => Some(name.as_str()),
            _ => None,
        };
        own.into_iter().chain(
            self.nested
                .iter()
                .filter(|d| d.kind == DeclKind::Function)
                .map(|d| d.name.as_str()),
        )
    }

    /// Class names declared by this unit, including nested ones
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        let own = match &self.kind {
            UnitKind::ClassDef { name } => Some(name.as_str()),
            _ => None,
        };
        own.into_iter().chain(
            self.nested
                .iter()
                .filter(|d| d.kind == DeclKind::Class)
                .map(|d| d.name.as_str()),
        )
    }
}

struct Line<'a> {
    start: usize,
    indent: usize,
    trimmed: &'a str,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.trimmed.is_empty()
    }
}

fn unit_kind(decl: &Declaration) -> UnitKind {
    match decl.kind {
        DeclKind::Function => UnitKind::FunctionDef {
            name: decl.name.clone(),
        },
        DeclKind::Class => UnitKind::ClassDef {
            name: decl.name.clone(),
        },
    }
}

fn whole_fence(fence: &CodeFence) -> Vec<AtomicUnit> {
    vec![AtomicUnit {
        kind: UnitKind::Preamble,
        start: 0,
        end: fence.text.len(),
        nested: Vec::new(),
    }]
}

/// Split a fence's text into ordered atomic units covering it with no gaps.
#[must_use]
pub fn resolve_units(fence: &CodeFence) -> Vec<AtomicUnit> {
    let language = Language::from_fence_tag(fence.language.as_deref());
    if !fence.closed || !language.supports_declarations() {
        return whole_fence(fence);
    }

    let mut offset = 0;
    let lines: Vec<Line<'_>> = fence
        .text
        .split_inclusive('\n')
        .map(|raw| {
            let content = raw.trim_end_matches(['\n', '\r']);
            let body = content.trim_start();
            let line = Line {
                start: offset,
                indent: content.len() - body.len(),
                trimmed: body.trim_end(),
            };
            offset += raw.len();
            line
        })
        .collect();

    let Some(base) = lines
        .iter()
        .filter(|line| !line.is_blank())
        .map(|line| line.indent)
        .min()
    else {
        return whole_fence(fence);
    };

    let attached_prefixes = language.attached_prefixes();
    let at_base = |line: &Line<'_>| !line.is_blank() && line.indent == base;

    // Declaration each line starts, following attribute/comment chains downward.
    let mut starts: Vec<Option<Declaration>> = vec![None; lines.len()];
    let mut attached = vec![false; lines.len()];
    for i in (0..lines.len()).rev() {
        let line = &lines[i];
        if !at_base(line) {
            continue;
        }
        if let Some(decl) = language.match_declaration(line.trimmed) {
            starts[i] = Some(decl);
        } else if attached_prefixes.iter().any(|p| line.trimmed.starts_with(p)) {
            let below = starts.get(i + 1).cloned().flatten();
            attached[i] = true;
            starts[i] = below;
        }
    }

    let mut units: Vec<AtomicUnit> = Vec::new();
    let mut current: Option<AtomicUnit> = None;

    for (i, line) in lines.iter().enumerate() {
        let continues_chain = i > 0 && attached[i - 1] && starts[i - 1].is_some();

        if let Some(decl) = starts[i].as_ref().filter(|_| !continues_chain) {
            if let Some(mut done) = current.take() {
                done.end = line.start;
                units.push(done);
            }
            current = Some(AtomicUnit::new(unit_kind(decl), line.start));
            continue;
        }

        let unit = current.get_or_insert_with(|| AtomicUnit::new(UnitKind::Preamble, 0));
        if line.is_blank() || starts[i].is_some() {
            continue;
        }

        if line.indent > base {
            if unit.is_declaration() {
                if let Some(decl) = language.match_declaration(line.trimmed) {
                    unit.nested.push(decl);
                }
            }
            continue;
        }

        if unit.is_declaration() && !language.is_closer(line.trimmed) {
            let mut done = std::mem::replace(unit, AtomicUnit::new(UnitKind::Trailer, line.start));
            done.end = line.start;
            units.push(done);
        }
    }

    if let Some(mut last) = current {
        last.end = fence.text.len();
        units.push(last);
    }

    log::debug!(
        "resolved {} atomic units in {} fence ({} declarations)",
        units.len(),
        language.as_str(),
        units.iter().filter(|u| u.is_declaration()).count()
    );
    units
}
