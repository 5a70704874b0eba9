//! Mapping of physical variables onto the flat state vector.
//!
//! Domains are laid out one after another. Inside a domain every macroscopic
//! node owns a contiguous block holding its particle profile followed by its
//! macro-only variables, so a node's particle couplings stay local and its
//! neighbors sit exactly one block away. Particle-only variables (no x
//! dependence) follow the node blocks.

use crate::config::ConfigError;

/// Domains of a P2D cell, in state-vector order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DomainKind {
    Anode,
    Separator,
    Cathode,
}

impl DomainKind {
    pub fn name(&self) -> &'static str {
        match self {
            DomainKind::Anode => "anode",
            DomainKind::Separator => "separator",
            DomainKind::Cathode => "cathode",
        }
    }
}

/// How a variable is distributed over the grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    /// One value per x node.
    Macro,
    /// One value per r node, shared by the whole domain.
    Particle,
    /// One value per (x, r) pair.
    MacroParticle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarDecl {
    pub name: &'static str,
    pub kind: VarKind,
}

impl VarDecl {
    pub const fn new(name: &'static str, kind: VarKind) -> Self {
        Self { name, kind }
    }
}

/// Offsets of all variables of one domain.
#[derive(Clone, Debug)]
pub struct DomainPointers {
    pub domain: DomainKind,
    /// First global index owned by the domain.
    pub start: usize,
    /// One past the last global index owned by the domain.
    pub end: usize,
    pub nx: usize,
    pub nr: usize,
    /// Size of one x-node block, the distance between the same variable at
    /// neighboring nodes.
    pub x_stride: usize,
    decls: Vec<VarDecl>,
    /// Per declaration: offset inside the node block, or inside the tail for
    /// particle-only variables.
    local: Vec<usize>,
}

impl DomainPointers {
    pub fn new(
        domain: DomainKind,
        decls: &[VarDecl],
        nx: usize,
        nr: usize,
        start: usize,
    ) -> Result<Self, ConfigError> {
        if nx == 0 {
            return Err(ConfigError::invalid(
                format!("{}.nx", domain.name()),
                "must be at least 1",
            ));
        }
        let needs_r = decls.iter().any(|d| d.kind != VarKind::Macro);
        if needs_r && nr == 0 {
            return Err(ConfigError::invalid(
                format!("{}.nr", domain.name()),
                "particle variables need at least one radial volume",
            ));
        }
        for (i, d) in decls.iter().enumerate() {
            if decls[..i].iter().any(|o| o.name == d.name) {
                return Err(ConfigError::invalid(
                    format!("{}.{}", domain.name(), d.name),
                    "variable declared twice",
                ));
            }
        }

        let mut local = Vec::with_capacity(decls.len());
        let mut block = 0;
        for d in decls {
            match d.kind {
                VarKind::MacroParticle => {
                    local.push(block);
                    block += nr;
                }
                VarKind::Macro => {
                    local.push(block);
                    block += 1;
                }
                VarKind::Particle => local.push(usize::MAX),
            }
        }

        let mut tail = 0;
        for (d, off) in decls.iter().zip(local.iter_mut()) {
            if d.kind == VarKind::Particle {
                *off = tail;
                tail += nr;
            }
        }

        Ok(Self {
            domain,
            start,
            end: start + nx * block + tail,
            nx,
            nr: if needs_r { nr } else { 0 },
            x_stride: block,
            decls: decls.to_vec(),
            local,
        })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn declarations(&self) -> &[VarDecl] {
        &self.decls
    }

    fn lookup(&self, name: &str) -> Option<(VarKind, usize)> {
        self.decls
            .iter()
            .zip(&self.local)
            .find(|(d, _)| d.name == name)
            .map(|(d, off)| (d.kind, *off))
    }

    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Global index of macro variable `name` at node `ix`.
    pub fn x_ptr(&self, name: &str, ix: usize) -> Option<usize> {
        match self.lookup(name)? {
            (VarKind::Macro, off) if ix < self.nx => Some(self.start + ix * self.x_stride + off),
            _ => None,
        }
    }

    /// Global index of macro x particle variable `name` at `(ix, ir)`.
    pub fn xr_ptr(&self, name: &str, ix: usize, ir: usize) -> Option<usize> {
        match self.lookup(name)? {
            (VarKind::MacroParticle, off) if ix < self.nx && ir < self.nr => {
                Some(self.start + ix * self.x_stride + off + ir)
            }
            _ => None,
        }
    }

    /// Global index of particle-only variable `name` at radial node `ir`.
    pub fn r_ptr(&self, name: &str, ir: usize) -> Option<usize> {
        match self.lookup(name)? {
            (VarKind::Particle, off) if ir < self.nr => {
                Some(self.start + self.nx * self.x_stride + off + ir)
            }
            _ => None,
        }
    }

    /// All global indices of `name`, x-major then r.
    pub fn indices(&self, name: &str) -> Vec<usize> {
        match self.lookup(name) {
            Some((VarKind::Macro, _)) => (0..self.nx).filter_map(|i| self.x_ptr(name, i)).collect(),
            Some((VarKind::MacroParticle, _)) => (0..self.nx)
                .flat_map(|i| (0..self.nr).map(move |j| (i, j)))
                .filter_map(|(i, j)| self.xr_ptr(name, i, j))
                .collect(),
            Some((VarKind::Particle, _)) => (0..self.nr).filter_map(|j| self.r_ptr(name, j)).collect(),
            None => Vec::new(),
        }
    }

    /// Every index owned by the domain, grouped by declaration.
    pub fn all_indices(&self) -> Vec<usize> {
        self.decls.iter().flat_map(|d| self.indices(d.name)).collect()
    }
}

/// Pointer map of the complete cell.
#[derive(Clone, Debug)]
pub struct PointerMap {
    pub domains: Vec<DomainPointers>,
    pub len: usize,
}

/// Declaration of one domain handed to [`PointerMap::build`].
pub struct DomainLayout<'a> {
    pub domain: DomainKind,
    pub vars: &'a [VarDecl],
    pub nx: usize,
    pub nr: usize,
}

impl PointerMap {
    /// Assign offsets for the domains in the given order.
    pub fn build(layouts: &[DomainLayout<'_>]) -> Result<Self, ConfigError> {
        let mut domains = Vec::with_capacity(layouts.len());
        let mut start = 0;
        for layout in layouts {
            if domains
                .iter()
                .any(|d: &DomainPointers| d.domain == layout.domain)
            {
                return Err(ConfigError::invalid(layout.domain.name(), "domain declared twice"));
            }
            let ptr = DomainPointers::new(layout.domain, layout.vars, layout.nx, layout.nr, start)?;
            start = ptr.end;
            domains.push(ptr);
        }
        let map = Self { domains, len: start };
        if !map.is_bijection() {
            return Err(ConfigError::invalid("pointers", "offsets overlap or leave gaps"));
        }
        Ok(map)
    }

    pub fn domain(&self, kind: DomainKind) -> Option<&DomainPointers> {
        self.domains.iter().find(|d| d.domain == kind)
    }

    /// True when the assigned offsets cover `0..len` exactly once.
    pub fn is_bijection(&self) -> bool {
        let mut seen = vec![false; self.len];
        for d in &self.domains {
            for idx in d.all_indices() {
                if idx >= self.len || seen[idx] {
                    return false;
                }
                seen[idx] = true;
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Values of macro variable `name` along x.
    pub fn macro_values(&self, kind: DomainKind, name: &str, y: &[f64]) -> Vec<f64> {
        self.domain(kind)
            .map(|d| (0..d.nx).filter_map(|i| d.x_ptr(name, i)).map(|k| y[k]).collect())
            .unwrap_or_default()
    }

    /// Radial profile of `name` at node `ix`.
    pub fn particle_values(&self, kind: DomainKind, name: &str, ix: usize, y: &[f64]) -> Vec<f64> {
        self.domain(kind)
            .map(|d| (0..d.nr).filter_map(|j| d.xr_ptr(name, ix, j)).map(|k| y[k]).collect())
            .unwrap_or_default()
    }

    /// Outermost radial value of `name` at every x node.
    pub fn surface_values(&self, kind: DomainKind, name: &str, y: &[f64]) -> Vec<f64> {
        self.domain(kind)
            .filter(|d| d.nr > 0)
            .map(|d| {
                (0..d.nx)
                    .filter_map(|i| d.xr_ptr(name, i, d.nr - 1))
                    .map(|k| y[k])
                    .collect()
            })
            .unwrap_or_default()
    }
}
