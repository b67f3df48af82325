//! Reference-point numbering: `reference_number = 10 * element_number + kind`.
//! Ported from `strecke.py::RefTyp` / `get_ref_nr` / `allocate_refpunkt`.

/// A reference-point kind. The two "Gegenrichtung" (reverse-direction)
/// variants are a bookkeeping convenience: they carry their own discriminant
/// for reference-number allocation, but are emitted with the *other*
/// direction's `RefTyp` attribute (§3: "reverse-direction signal (8; recorded
/// as type 4 with reverse direction)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ReferenceKind {
    Staging = 0,
    Register = 2,
    Switch = 3,
    Signal = 4,
    Release = 5,
    SignalReverse = 8,
    SwitchReverse = 9,
}

impl ReferenceKind {
    /// The `RefTyp` attribute value this kind is emitted with.
    pub fn emitted_type_code(self) -> u32 {
        match self {
            ReferenceKind::SignalReverse => 4,
            ReferenceKind::SwitchReverse => 3,
            other => other as u32,
        }
    }

    /// Whether this reference lives on the element's reverse direction
    /// (so `StrNorm="1"` is omitted on emission).
    pub fn is_reverse(self) -> bool {
        matches!(self, ReferenceKind::SignalReverse | ReferenceKind::SwitchReverse)
    }
}

/// `reference_number = 10 * element_number + kind`.
pub fn ref_number(element_nr: u32, kind: ReferenceKind) -> u32 {
    10 * element_nr + kind as u32
}
