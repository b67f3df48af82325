//! The v2 track-graph node, lifted almost directly from `strecke.py`'s
//! per-element record. Curve control vectors and orientation angles are kept
//! as their original textual form so re-emission doesn't perturb values the
//! converter never actually needs to compute with.

use crate::event::Event;
use crate::signal::Signal;

/// A frame mounted on an auxiliary route signal ("Fahrstraßensignal", always
/// recorded in the reverse direction). Unlike a combination signal's frames,
/// these inherit the signal's own pose and carry no position of their own.
#[derive(Debug, Clone)]
pub struct AuxFrame {
    pub file: String,
}

/// An auxiliary route signal: a v2 "Fahrstraßensignal in Gegenrichtung
/// eingebaut" lifted to a v3 signal with up to three state frames.
#[derive(Debug, Clone)]
pub struct AuxSignal {
    pub pos: (String, String, String),
    pub phi: (String, String, String),
    pub static_frame: AuxFrame,
    pub not_set_frame: Option<AuxFrame>,
    pub set_frame: Option<AuxFrame>,
    pub event_code: u32,
    /// The element this signal is coupled to, if any (`0` in the v2 file
    /// means "no coupling").
    pub coupled_element: Option<u32>,
    pub bounding_r: u32,
}

/// A track-graph node: one v2 element record.
#[derive(Debug, Clone)]
pub struct TrackElement {
    pub nr: u32,
    /// Kilometration, in km.
    pub km: f64,
    /// `true` for increasing kilometration ("+").
    pub direction_positive: bool,
    pub event: Option<Event>,
    /// Start control vector, preserved as read.
    pub g: (String, String, String),
    /// End control vector, preserved as read.
    pub b: (String, String, String),
    pub ueberh: String,
    /// Successor element numbers in the normal direction, zeros dropped.
    pub successors: Vec<u32>,
    /// Populated in the second graph-building pass; the normal-direction
    /// predecessors of this element.
    pub predecessors: Vec<u32>,
    /// m/s.
    pub vmax: f64,
    pub aux_signal: Option<AuxSignal>,
    pub signal: Option<Signal>,
    pub register: Option<u32>,
}

impl TrackElement {
    pub fn is_release_point(&self) -> bool {
        matches!(self.event, Some(Event::ReleaseMarker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(event: Option<Event>, register: Option<u32>) -> TrackElement {
        TrackElement {
            nr: 1,
            km: 0.0,
            direction_positive: true,
            event,
            g: ("0".into(), "0".into(), "0".into()),
            b: ("0".into(), "0".into(), "0".into()),
            ueberh: "0".into(),
            successors: vec![],
            predecessors: vec![],
            vmax: 0.0,
            aux_signal: None,
            signal: None,
            register,
        }
    }

    #[test]
    fn release_marker_is_a_release_point() {
        let e = element(Some(Event::ReleaseMarker), None);
        assert!(e.is_release_point());
    }

    #[test]
    fn non_release_point_is_not_a_release_point() {
        let e = element(Some(Event::Pzb1000), None);
        assert!(!e.is_release_point());
    }
}
