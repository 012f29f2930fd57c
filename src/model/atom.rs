//! Atom records carried through the pipeline untouched.
//!
//! Coordinates are never edited by this crate; atoms exist so structures can be written
//! back out faithfully after filtering, and so external engines receive complete inputs.

use super::types::Point;
use smol_str::SmolStr;
use std::fmt;

/// Labeled atom with its element symbol and Cartesian position in ångströms.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Atom name as it appears in the structure file (e.g. `CA`).
    pub name: SmolStr,
    /// Element symbol as written in columns 77-78 of a PDB record, possibly empty.
    pub element: SmolStr,
    pub pos: Point,
    pub occupancy: f64,
    pub b_factor: f64,
}

impl Atom {
    pub fn new(name: &str, element: &str, pos: Point) -> Self {
        Self {
            name: SmolStr::new(name),
            element: SmolStr::new(element),
            pos,
            occupancy: 1.0,
            b_factor: 0.0,
        }
    }

    /// Returns `true` when the atom belongs to the protein backbone set `{N, CA, C}`.
    pub fn is_backbone(&self) -> bool {
        is_backbone_name(&self.name)
    }
}

/// Backbone atoms whose absence prevents in-place atom completion.
pub const BACKBONE_ATOMS: [&str; 3] = ["C", "CA", "N"];

pub fn is_backbone_name(name: &str) -> bool {
    BACKBONE_ATOMS.contains(&name)
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Atom {{ name: \"{}\", element: {}, pos: [{:.3}, {:.3}, {:.3}] }}",
            self.name, self.element, self.pos.x, self.pos.y, self.pos.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_new_sets_defaults() {
        let atom = Atom::new("CA", "C", Point::new(1.0, 2.0, 3.0));
        assert_eq!(atom.name, "CA");
        assert_eq!(atom.element, "C");
        assert_eq!(atom.occupancy, 1.0);
        assert_eq!(atom.b_factor, 0.0);
    }

    #[test]
    fn backbone_detection_matches_n_ca_c_only() {
        assert!(Atom::new("N", "N", Point::origin()).is_backbone());
        assert!(Atom::new("CA", "C", Point::origin()).is_backbone());
        assert!(Atom::new("C", "C", Point::origin()).is_backbone());
        assert!(!Atom::new("O", "O", Point::origin()).is_backbone());
        assert!(!Atom::new("CB", "C", Point::origin()).is_backbone());
    }

    #[test]
    fn display_formats_coordinates() {
        let atom = Atom::new("OXT", "O", Point::new(1.0, -2.5, 0.125));
        assert_eq!(
            atom.to_string(),
            "Atom { name: \"OXT\", element: O, pos: [1.000, -2.500, 0.125] }"
        );
    }
}
