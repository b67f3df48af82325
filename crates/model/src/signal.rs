//! The v3 "combination signal" model lifted from the v2 matrix/column
//! description. Ported from `strecke.py`'s `Signal` / `MatrixZeile` /
//! `MatrixEintrag` classes.

/// A signal frame mounted on a combination signal, with its own pose relative
/// to the signal's chosen origin (selected by the `"1"`/`"2"` mount tag in
/// the v2 file).
#[derive(Debug, Clone)]
pub struct CombiFrame {
    pub file: String,
    pub pos: (f64, f64, f64),
    /// Euler angles, kept as their original textual form (never recomputed).
    pub phi: (String, String, String),
}

/// One matrix row: a destination (block, track) and its stopping speed.
#[derive(Debug, Clone, Default)]
pub struct MatrixRow {
    pub block: String,
    pub gleis: String,
    /// km/h; `0` means stop.
    pub vmax: i32,
    pub entries: Vec<MatrixEntry>,
}

impl MatrixRow {
    pub fn is_stop(&self) -> bool {
        self.vmax == 0
    }

    pub fn destination(&self) -> (&str, &str) {
        (&self.block, &self.gleis)
    }
}

/// One (row, column) matrix cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixEntry {
    pub bild: i32,
    /// km/h; `-1` means no speed restriction.
    pub vmax: i32,
    pub id: i32,
    pub er1: i32,
    pub er2: i32,
}

/// A combination signal: the v3 lift of a v2 matrix-of-aspects description.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    pub element_nr: u32,
    pub block: String,
    pub gleis: String,
    pub origin: (f64, f64, f64),
    pub frames: Vec<CombiFrame>,
    pub matrix: Vec<MatrixRow>,
    /// Column speeds, km/h; `-1` means "no expectation".
    pub vsig_geschw: Vec<i32>,
    /// Upstream pre-signal element numbers.
    pub vsigs: Vec<u32>,
    pub bounding_r: u32,
}

impl Signal {
    pub fn is_main_signal(&self) -> bool {
        self.matrix.iter().any(MatrixRow::is_stop)
    }

    pub fn is_named(&self) -> bool {
        !self.block.is_empty() && !self.gleis.is_empty()
    }

    /// First row whose destination is `vMax=0`, defaulting to row 0 with a
    /// warning if none exists (a `MatrixAnomaly`, §7).
    pub fn stop_row(&self) -> usize {
        match self.matrix.iter().position(MatrixRow::is_stop) {
            Some(idx) => idx,
            None => {
                log::warn!(
                    "signal {} {}: no row with vMax=0, defaulting to row 0",
                    self.block,
                    self.gleis
                );
                0
            }
        }
    }

    /// Resolve `get_vsig_spalte` (§4.5.1): the pre-signal column for a
    /// signaled speed `v` and identification key `id`.
    pub fn vsig_column(&self, v: i32, id: i32) -> usize {
        let mut id_counter = 0;
        for (idx, &speed) in self.vsig_geschw.iter().enumerate() {
            if speed == v {
                if id_counter == id {
                    return idx;
                }
                id_counter += 1;
            }
        }

        let mut column = 0;
        let mut column_speed = -1;
        for (idx, &speed) in self.vsig_geschw.iter().enumerate() {
            if v != 0 && speed != 0 && v_less_than(speed, v) && speed > column_speed {
                column = idx;
                column_speed = speed;
            }
        }
        column
    }
}

/// `-1` is treated as "+infinity": any finite speed compares less than it.
pub fn v_less_than(v1: i32, v2: i32) -> bool {
    if v2 == -1 {
        true
    } else if v1 == -1 {
        false
    } else {
        v1 < v2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(block: &str, gleis: &str, vmax: i32, entries: Vec<MatrixEntry>) -> MatrixRow {
        MatrixRow {
            block: block.to_owned(),
            gleis: gleis.to_owned(),
            vmax,
            entries,
        }
    }

    #[test]
    fn v_less_than_treats_minus_one_as_infinity() {
        assert!(v_less_than(60, -1));
        assert!(!v_less_than(-1, 60));
        assert!(v_less_than(40, 60));
        assert!(!v_less_than(60, 40));
    }

    #[test]
    fn vsig_column_exact_match_by_id() {
        // S4: vsig_geschw = [-1, 0, 60, 100], looking for v=60, ID=0 -> column 2.
        let sig = Signal {
            vsig_geschw: vec![-1, 0, 60, 100],
            ..Default::default()
        };
        assert_eq!(sig.vsig_column(60, 0), 2);
    }

    #[test]
    fn vsig_column_falls_back_to_largest_smaller_speed() {
        // upstream pre-signal with vsig_geschw = [60, 80], target v=60 matches exactly at idx 0.
        let sig = Signal {
            vsig_geschw: vec![60, 80],
            ..Default::default()
        };
        assert_eq!(sig.vsig_column(60, 0), 0);
    }

    #[test]
    fn vsig_column_excludes_zero_vs_zero() {
        let sig = Signal {
            vsig_geschw: vec![0, 40],
            ..Default::default()
        };
        // v=0 never matches the fallback search (excluded), and no exact match exists
        // for a nonexistent id, so it defaults to column 0.
        assert_eq!(sig.vsig_column(0, 5), 0);
    }

    #[test]
    fn stop_row_defaults_to_zero_when_absent() {
        let sig = Signal {
            matrix: vec![row("A", "1", 60, vec![])],
            ..Default::default()
        };
        assert_eq!(sig.stop_row(), 0);
    }

    #[test]
    fn stop_row_finds_first_stopping_row() {
        let sig = Signal {
            matrix: vec![row("A", "1", 60, vec![]), row("B", "1", 0, vec![])],
            ..Default::default()
        };
        assert_eq!(sig.stop_row(), 1);
        assert!(sig.is_main_signal());
    }
}
