//! Converts a Zusi 2 timetable (`.fpn`) into a Zusi 3 timetable. Ported from
//! `zusi2to3/fahrplan.py::conv_fpn`.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use model::Result;
use util::{LegacyReader, ZusiPaths};
use xmltree::{Document, Element};

/// Converts `path` (an absolute path to a v2 `.fpn` file), referencing the
/// already-converted route module `st3_name` (the v3-relative filename
/// returned by [`strecke::convert_route`]) and using `rekursionstiefe` (the
/// recursion depth `conv_str` read out of that same route file) for every
/// train's `Rekursionstiefe` attribute.
pub fn convert_timetable(paths: &ZusiPaths, path: &Path, st3_name: &str, rekursionstiefe: u32) -> Result<()> {
    let mut seen_nrs: HashSet<String> = HashSet::new();

    let file = File::open(path)?;
    let mut reader = LegacyReader::new(file);
    reader.read_line()?; // version marker, not validated by the original either

    let inname2_rel = {
        let mut rel = paths.abs_to_z2rel(path);
        rel.pop();
        rel.push('n');
        rel
    };
    let outname2_rel = paths.z2rel_to_z3rel(&inname2_rel);
    let outname2_abs = paths.z3rel_to_abs(&outname2_rel);
    log::info!("{} -> {}", path.display(), outname2_abs.display());

    let anfangs_zeit = reader.read_line_required("Fahrplan start time")?.trim().to_string();
    let mut fahrplan = Element::new("Fahrplan").attr("AnfangsZeit", anfangs_zeit);
    fahrplan.push_child(
        Element::new("StrModul").child(Element::new("Datei").attr("Dateiname", st3_name.to_string())),
    );

    let fpn_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    loop {
        let zugdatei = match reader.read_line()? {
            None => break,
            Some(line) if line.is_empty() => break,
            Some(line) => line,
        };

        let mut trn = Element::new("trn").attr("Rekursionstiefe", rekursionstiefe.to_string());
        let zug_path = join_windows_relative(&fpn_dir, zugdatei.trim());
        convert_train(&zug_path, &mut trn, &mut seen_nrs)?;
        fahrplan.push_child(trn);
    }

    let root = Element::new("Zusi").child(fahrplan);
    Document::new(root).write_to_file(&outname2_abs)?;

    Ok(())
}

fn join_windows_relative(base: &Path, rel: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for part in rel.split('\\') {
        if !part.is_empty() {
            out.push(part);
        }
    }
    out
}

fn convert_train(zug_path: &Path, trn: &mut Element, seen_nrs: &mut HashSet<String>) -> Result<()> {
    let file = File::open(zug_path)?;
    let mut reader = LegacyReader::new(file);
    reader.read_line()?; // version marker

    let orig_zugnr = reader.read_line_required("train number")?.trim().to_string();
    let mut zugnr = orig_zugnr.clone();
    let mut i = 1;
    while seen_nrs.contains(&zugnr) {
        zugnr = format!("{orig_zugnr}_{i}");
        i += 1;
    }
    seen_nrs.insert(zugnr.clone());
    trn.set_attr("Nummer", zugnr.clone());

    let gattung = reader.read_line_required("Gattung")?.trim().to_string();
    trn.set_attr("Gattung", gattung.clone());

    reader.read_line()?; // Bremsstellung
    let n_fahrzeuge_minus_1 = reader.read_int("vehicle count")? as u32;
    reader.read_line()?; // lok_gedreht, never referenced again in the original either
    reader.read_line()?;
    let sp_zug_niedriger = reader.read_float_required("spZugNiedriger")? / 3.6;
    trn.set_attr("spZugNiedriger", sp_zug_niedriger.to_string());
    reader.read_line()?;
    reader.read_line()?; // Lok

    loop {
        let line = reader.read_line_required("PZB-Modus block")?;
        if line.trim() == "#IF" {
            break;
        }
    }

    trn.set_attr("Prio", reader.read_line_required("Prio")?.trim().to_string());
    reader.read_line()?; // Einsatzreferenz
    reader.read_line()?; // Treibstoffvorrat
    reader.read_line()?; // reserviert
    reader.read_line()?; // reserviert
    reader.read_line()?; // Zugtyp
    trn.set_attr("Zuglauf", reader.read_line_required("Zuglauf")?.trim().to_string());
    reader.read_line()?; // Türsystem
    for _ in 0..6 {
        reader.read_line()?; // reserviert
    }

    let mut erster_eintrag = true;
    let mut hat_zugwende = false;
    loop {
        let betrst = reader.read_line_required("Betrst")?.trim().to_string();
        if betrst == "#IF" {
            break;
        }

        let mut entry = Element::new("FahrplanEintrag").attr("Betrst", betrst.clone());
        entry.set_attr("Ank", reader.read_line_required("Ank")?.trim().to_string());
        entry.set_attr("Abf", reader.read_line_required("Abf")?.trim().to_string());

        loop {
            let gleis = reader.read_line_required("FahrplanSignalEintrag")?.trim().to_string();
            if gleis == "#" {
                break;
            }
            entry.push_child(Element::new("FahrplanSignalEintrag").attr("FahrplanSignal", gleis.clone()));
            if erster_eintrag {
                erster_eintrag = false;
                trn.set_attr("FahrstrName", format!("Aufgleispunkt -> {betrst} {gleis}"));
            }
        }

        // Once a turnaround has been detected at any earlier entry, this flag
        // never clears, so every entry from that point on is discarded.
        let keep = !hat_zugwende;

        loop {
            let spezialaktion = reader.read_line_required("Spezialaktion")?.trim().to_string();
            if spezialaktion == "#" {
                break;
            }
            if spezialaktion == "1" || spezialaktion == "2" {
                log::warn!("{gattung} {zugnr}: Zugwende {betrst}");
                hat_zugwende = true;
            }
            reader.read_line()?;
            reader.read_line()?;
        }
        reader.read_line()?;

        if keep {
            trn.push_child(entry);
        }
    }

    for _ in 0..n_fahrzeuge_minus_1 {
        reader.read_line()?;
        reader.read_line()?;
        reader.read_line()?;
    }

    trn.push_child(
        Element::new("FahrzeugVarianten")
            .attr("Bezeichnung", "default")
            .attr("ZufallsWert", "1")
            .child(
                Element::new("FahrzeugInfo")
                    .attr("IDHaupt", "1")
                    .attr("IDNeben", "1")
                    .child(Element::new("Datei").attr(
                        "Dateiname",
                        r"rollingstock\Deutschland\Epoche5\Dieseltriebwagen\RegioShuttle\RS1.rv.fzg",
                    )),
            ),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn paths(tmp: &tempfile::TempDir) -> ZusiPaths {
        ZusiPaths {
            z2_abs: tmp.path().join("z2"),
            z3_abs: tmp.path().join("z3"),
        }
    }

    fn write_file(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn train_content(nr: &str) -> String {
        let mut s = String::new();
        s.push_str("2.3\r\n");
        s.push_str(&format!("{nr}\r\n")); // orig_zugnr
        s.push_str("Dieseltriebwagen\r\n"); // Gattung
        s.push_str("Bremsstellung\r\n");
        s.push_str("1\r\n"); // n_fahrzeuge - 1 = 1 -> 2 total
        s.push_str("0\r\n"); // lok_gedreht
        s.push_str("reserviert\r\n");
        s.push_str("100,0\r\n"); // spZugNiedriger (km/h)
        s.push_str("reserviert\r\n");
        s.push_str("Lok\r\n");
        s.push_str("#IF\r\n"); // end of PZB-Modus block
        s.push_str("1\r\n"); // Prio
        s.push_str("Einsatzreferenz\r\n");
        s.push_str("Treibstoffvorrat\r\n");
        s.push_str("reserviert\r\n");
        s.push_str("reserviert\r\n");
        s.push_str("Zugtyp\r\n");
        s.push_str("Hauptbahn\r\n"); // Zuglauf
        s.push_str("Türsystem\r\n");
        for _ in 0..6 {
            s.push_str("reserviert\r\n");
        }
        // one stop
        s.push_str("Bahnhof A\r\n");
        s.push_str("0000\r\n"); // Ank
        s.push_str("0001\r\n"); // Abf
        s.push_str("1\r\n"); // gleis
        s.push_str("#\r\n");
        s.push_str("#\r\n"); // no Spezialaktion
        s.push_str("reserviert\r\n");
        s.push_str("#IF\r\n"); // end of stops
        for _ in 0..(1 * 3) {
            s.push_str("x\r\n");
        }
        s
    }

    #[test]
    fn converts_a_single_stop_train_and_names_the_route_from_the_first_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths(&tmp);
        let fpn_path = paths.z2_abs.join("Fahrplan").join("test.fpn");
        write_file(&fpn_path, "2.3\r\n08:00\r\nZuege\\rb1.trn\r\n");
        write_file(&paths.z2_abs.join("Fahrplan").join("rb1.trn"), &train_content("12345"));

        convert_timetable(&paths, &fpn_path, "Temp\\_z2conv\\test.st3", 5).unwrap();

        // inname2_rel swaps the fpn's last character for 'n', a no-op for a
        // ".fpn" file; outname2_rel then lands it in the usual staging dir.
        let out_abs = paths.z3rel_to_abs(&paths.z2rel_to_z3rel("Fahrplan\\test.fpn"));
        let xml = std::fs::read_to_string(&out_abs).unwrap();
        assert!(xml.contains(r#"Nummer="12345""#));
        assert!(xml.contains(r#"Gattung="Dieseltriebwagen""#));
        assert!(xml.contains(r#"FahrstrName="Aufgleispunkt -> Bahnhof A 1""#));
        assert!(xml.contains("RS1.rv.fzg"));
    }

    #[test]
    fn duplicate_train_numbers_get_a_disambiguating_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths(&tmp);
        let fpn_path = paths.z2_abs.join("Fahrplan").join("dup.fpn");
        write_file(
            &fpn_path,
            "2.3\r\n08:00\r\nZuege\\a.trn\r\nZuege\\b.trn\r\n",
        );
        write_file(&paths.z2_abs.join("Fahrplan").join("a.trn"), &train_content("500"));
        write_file(&paths.z2_abs.join("Fahrplan").join("b.trn"), &train_content("500"));

        convert_timetable(&paths, &fpn_path, "Temp\\_z2conv\\dup.st3", 0).unwrap();

        let out_abs = paths.z3rel_to_abs(&paths.z2rel_to_z3rel("Fahrplan\\dup.fpn"));
        let xml = std::fs::read_to_string(&out_abs).unwrap();
        assert!(xml.contains(r#"Nummer="500""#));
        assert!(xml.contains(r#"Nummer="500_1""#));
    }
}
