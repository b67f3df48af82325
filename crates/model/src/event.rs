//! Event-code to tagged-variant mapping, centralized per the Design Notes
//! instead of re-derived ad hoc at each call site. Ported from
//! `zusi2to3/strecke.py::conv_ereignis`, which documents every code inline
//! even though most of the 3xxx/4xxx range is presently a no-op.

/// An event attached to a track element's normal direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// Conditional derailment: triggers above `speed_kph` km/h (+ tolerance).
    ConditionalDerailment { speed_kph: u32 },
    /// PZB 500 Hz beacon.
    Pzb500,
    /// PZB 1000 Hz beacon.
    Pzb1000,
    /// Conditional PZB 1000 Hz beacon, e.g. code 1105 = 1000 Hz at >=105 km/h.
    ConditionalPzb1000 { threshold_kph: u32 },
    /// PZB 2000 Hz beacon.
    Pzb2000,
    /// Conditional PZB 2000 Hz beacon (speed-check section).
    ConditionalPzb2000 { threshold_kph: u32 },
    /// Release a route ("Fahrstraße auflösen"). Materialized as a release-point
    /// reference rather than an `<Ereignis>` node.
    ReleaseMarker,
    /// A documented code with no materialized effect in this converter. The
    /// code is preserved so the byte offsets of the v2 element record stay in
    /// sync and so the table below stays the single source of truth for what
    /// each number means.
    Unmapped(u32),
}

impl Event {
    /// Decodes a raw event code. Returns `None` for code `0` ("kein Ereignis").
    pub fn decode(code: u32) -> Option<Event> {
        match code {
            0 => None,
            1..=499 => Some(Event::ConditionalDerailment { speed_kph: code }),
            500 => Some(Event::Pzb500),
            1000 => Some(Event::Pzb1000),
            1001..=1500 => Some(Event::ConditionalPzb1000 {
                threshold_kph: code - 1000,
            }),
            2000 => Some(Event::Pzb2000),
            2001..=2500 => Some(Event::ConditionalPzb2000 {
                threshold_kph: code - 2000,
            }),
            3001 => Some(Event::Unmapped(code)), // Fahrstraße anfordern (unnecessary, trains request automatically)
            3002 => Some(Event::ReleaseMarker),
            3003 => Some(Event::Unmapped(code)), // Zug entfernen
            3004 => Some(Event::Unmapped(code)), // Zwangshalt
            3005 => Some(Event::Unmapped(code)), // Langsamfahrt Ende
            3006 => Some(Event::Unmapped(code)), // Betriebsstelle
            3007 => Some(Event::Unmapped(code)), // Haltepunkt erwarten
            3008 => Some(Event::Unmapped(code)), // Bahnsteigmitte
            3009 => Some(Event::Unmapped(code)), // Bahnsteigende
            3010 => Some(Event::Unmapped(code)), // Langsamfahrt Anfang
            3011 => Some(Event::Unmapped(code)), // Pfeifen
            3012 => Some(Event::Unmapped(code)), // LZB-Anfang
            3013 => Some(Event::Unmapped(code)), // LZB-Ende
            3021 => Some(Event::Unmapped(code)), // vorher keine Fahrstraße
            3022 => Some(Event::Unmapped(code)), // Zp9-Signal
            3023 => Some(Event::Unmapped(code)), // Weiterfahrt nach Halt
            3024 => Some(Event::Unmapped(code)), // Signum Warnung
            3025 => Some(Event::Unmapped(code)), // Signum Halt
            3026 => Some(Event::Unmapped(code)), // naechste Fahrstrasse ab 1000m
            3027 => Some(Event::Unmapped(code)), // naechste Fahrstrasse ab 2000m
            3028 => Some(Event::Unmapped(code)), // naechste Fahrstrasse ab 3000m
            3029 => Some(Event::Unmapped(code)), // vorher keine Vorsignalverknuepfung
            3030 => Some(Event::Unmapped(code)), // ohne Funktion
            3031 => Some(Event::Unmapped(code)), // Befehl A
            3032 => Some(Event::Unmapped(code)), // Befehl A (Stillstand)
            3033 => Some(Event::Unmapped(code)), // Befehl B
            3034 => Some(Event::Unmapped(code)), // Befehl B (Stillstand)
            3035 => Some(Event::Unmapped(code)), // Langsamfahrtende (Zuganfang)
            3036 => Some(Event::Unmapped(code)), // Wendepunkt
            3037 => Some(Event::Unmapped(code)), // Wendepunkt auf anderen Blocknamen
            3038 => Some(Event::Unmapped(code)), // Signal ist zugbedient
            3039 => Some(Event::Unmapped(code)), // zugbedientes Signal schalten
            3040 => Some(Event::Unmapped(code)), // Streckensound
            3041 => Some(Event::Unmapped(code)), // Abrupt-Halt
            4000 => Some(Event::Unmapped(code)), // GNT: keine Geschwindigkeitserhoehung
            4001 => Some(Event::Unmapped(code)), // GNT-Anfang
            4002 => Some(Event::Unmapped(code)), // GNT-Ende
            4003 => Some(Event::Unmapped(code)), // GNT: PZB-Unterdrueckung auf 150m
            4004..=4500 => Some(Event::Unmapped(code)), // GNT: erhoehte Geschwindigkeit
            other => Some(Event::Unmapped(other)),
        }
    }

    pub fn is_release_marker(&self) -> bool {
        matches!(self, Event::ReleaseMarker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_no_event() {
        assert_eq!(Event::decode(0), None);
    }

    #[test]
    fn derailment_range() {
        assert_eq!(
            Event::decode(100),
            Some(Event::ConditionalDerailment { speed_kph: 100 })
        );
    }

    #[test]
    fn conditional_pzb_1000() {
        assert_eq!(
            Event::decode(1105),
            Some(Event::ConditionalPzb1000 { threshold_kph: 105 })
        );
    }

    #[test]
    fn release_marker() {
        assert_eq!(Event::decode(3002), Some(Event::ReleaseMarker));
        assert!(Event::decode(3002).unwrap().is_release_marker());
    }

    #[test]
    fn undocumented_code_is_preserved_not_dropped() {
        assert_eq!(Event::decode(9999), Some(Event::Unmapped(9999)));
    }
}
