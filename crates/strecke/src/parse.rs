//! The single linear pass over a v2 `.str` file: header, staging points, and
//! the per-element record loop. Ported from `conv_str` in `strecke.py`
//! (everything up to, but not including, route synthesis).

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use model::{
    AuxFrame, AuxSignal, ConvertError, Event, MatrixEntry, MatrixRow, Result, Signal, TrackElement,
};
use util::{LegacyReader, ZusiPaths};
use xmltree::Element;

use crate::refs::{allocate_refpunkt, event_xml};

pub struct ParsedRoute {
    pub elements: HashMap<u32, TrackElement>,
    pub element_order: Vec<u32>,
    pub signale: HashMap<u32, Signal>,
    pub signal_order: Vec<u32>,
    pub anonyme_signale: HashMap<u32, Signal>,
    pub fahrstrsignale: HashSet<u32>,
    pub aufgleispunkte: Vec<u32>,
    pub aufgleis_refs: Vec<Element>,
    pub extra_refs: HashMap<u32, Vec<Element>>,
    pub str_element_nodes: HashMap<u32, Element>,
    pub ls_dateiname: String,
    pub outname_rel: String,
    pub rekursionstiefe: u32,
}

pub fn parse(paths: &ZusiPaths, path: &Path) -> Result<ParsedRoute> {
    let file = File::open(path)?;
    let mut reader = LegacyReader::new(file);

    let version = reader.read_line_required("version marker")?;
    if version.trim() != "2.3" {
        return Err(ConvertError::VersionMismatch { found: version });
    }
    for _ in 0..2 {
        reader.read_line()?;
    }
    let rekursionstiefe = reader.read_u32("recursion depth")?;
    for _ in 0..2 {
        reader.skip_until_hash()?;
    }
    reader.read_line()?;
    let ls_datei = reader.read_line_required("scenery filename")?;
    let ls_datei = ls_datei.trim().to_string();

    let ls_conv = landschaft::convert_scenery(paths, &ls_datei, true)?;

    let mut out_stem = path.to_path_buf();
    if let Some(name) = out_stem.file_name().and_then(|n| n.to_str()) {
        let mut swapped = name.to_string();
        swapped.pop();
        swapped.push('3');
        out_stem.set_file_name(swapped);
    }
    let inname_rel = paths.abs_to_z2rel(&out_stem);
    let outname_rel = paths.z2rel_to_z3rel(&inname_rel);

    let mut aufgleispunkte = Vec::new();
    let mut aufgleis_refs = Vec::new();
    loop {
        let refnr_line = reader.read_line_required("staging point reference number")?;
        if refnr_line.starts_with('#') {
            break;
        }
        let elem_nr = reader.read_u32("staging point element")?;
        let beschr = reader.read_line_required("staging point description")?;
        aufgleispunkte.push(elem_nr);
        let mut node = allocate_refpunkt(elem_nr, model::ReferenceKind::Staging);
        node.set_attr("Info", beschr.trim().to_string());
        aufgleis_refs.push(node);
    }

    reader.skip_until_hash()?;

    let mut elements: HashMap<u32, TrackElement> = HashMap::new();
    let mut element_order = Vec::new();
    let mut signale = HashMap::new();
    let mut signal_order = Vec::new();
    let mut anonyme_signale = HashMap::new();
    let mut fahrstrsignale = HashSet::new();
    let mut extra_refs: HashMap<u32, Vec<Element>> = HashMap::new();
    let mut str_element_nodes = HashMap::new();
    let mut regnr = 20000u32;

    loop {
        let elem_nr = match reader.read_line()? {
            None => break,
            Some(line) if line.is_empty() => break,
            Some(line) => line.trim().parse::<u32>().map_err(|_| ConvertError::InvalidFloat { line })?,
        };

        let mut refs_here = Vec::new();

        let km = reader.read_float_required("kilometration")? / 1000.0;
        let direction_positive = reader.read_line_required("kilometration direction")?.trim() == "+";
        reader.read_line()?; // scenery label, "#" repeats the predecessor's
        let er_nr = reader.read_u32("event code")?;
        let event = Event::decode(er_nr);

        let g = (
            reader.read_float_str_required("g.X")?,
            reader.read_float_str_required("g.Y")?,
            reader.read_float_str_required("g.Z")?,
        );
        let b = (
            reader.read_float_str_required("b.X")?,
            reader.read_float_str_required("b.Y")?,
            reader.read_float_str_required("b.Z")?,
        );
        let ueberh = reader.read_float_str_required("Ueberh")?;

        let raw_succ = [
            reader.read_u32("successor 1")?,
            reader.read_u32("successor 2")?,
            reader.read_u32("successor 3")?,
        ];
        let successors: Vec<u32> = raw_succ.into_iter().filter(|&n| n != 0).collect();
        if successors.len() > 1 {
            refs_here.push(allocate_refpunkt(elem_nr, model::ReferenceKind::Switch));
        }

        let vmax = reader.read_float_required("vMax")? / 3.6;
        for _ in 0..4 {
            reader.read_line()?;
        }

        let aux_signal = parse_aux_signal(paths, &mut reader, elem_nr, &mut fahrstrsignale)?;
        if aux_signal.is_some() {
            refs_here.push(allocate_refpunkt(elem_nr, model::ReferenceKind::SignalReverse));
        }

        let signal = parse_combi_signal(paths, &mut reader, elem_nr)?;
        if let Some(sig) = &signal {
            if sig.is_named() {
                signale.insert(elem_nr, sig.clone());
                signal_order.push(elem_nr);
            } else {
                anonyme_signale.insert(elem_nr, sig.clone());
            }
            refs_here.push(allocate_refpunkt(elem_nr, model::ReferenceKind::Signal));
        }

        let mut register = reader.read_u32("register")?;
        if matches!(event, Some(Event::ReleaseMarker)) {
            refs_here.push(allocate_refpunkt(elem_nr, model::ReferenceKind::Release));
            if register == 0 {
                log::warn!("no register at release element {elem_nr}, inventing one");
                register = regnr;
                regnr += 1;
            }
        }
        let register = if register != 0 { Some(register) } else { None };
        if register.is_some() {
            refs_here.push(allocate_refpunkt(elem_nr, model::ReferenceKind::Register));
        }

        let element = TrackElement {
            nr: elem_nr,
            km,
            direction_positive,
            event,
            g,
            b,
            ueberh,
            successors,
            predecessors: Vec::new(),
            vmax,
            aux_signal,
            signal,
            register,
        };

        str_element_nodes.insert(elem_nr, build_str_element_node(&element, &outname_rel));
        elements.insert(elem_nr, element);
        element_order.push(elem_nr);
        extra_refs.insert(elem_nr, refs_here);
    }

    // Second pass: predecessors and reverse-switch reference points.
    let mut post_refs = Vec::new();
    for &elem_nr in &element_order {
        let succs = elements[&elem_nr].successors.clone();
        for succ in succs {
            let preds_len = {
                let succ_el = elements.get_mut(&succ).ok_or(ConvertError::MissingElement(succ))?;
                succ_el.predecessors.push(elem_nr);
                succ_el.predecessors.len()
            };
            if preds_len == 2 {
                post_refs.push(allocate_refpunkt(succ, model::ReferenceKind::SwitchReverse));
            }
        }
    }

    // Now that predecessors are known, attach <NachGegen> to every node.
    for &elem_nr in &element_order {
        let element = &elements[&elem_nr];
        let node = str_element_nodes.get_mut(&elem_nr).unwrap();
        for &pred in &element.predecessors {
            node.push_child(Element::new("NachGegen").attr("Nr", pred.to_string()));
        }
    }
    extra_refs.entry(0).or_default().splice(0..0, post_refs);

    Ok(ParsedRoute {
        elements,
        element_order,
        signale,
        signal_order,
        anonyme_signale,
        fahrstrsignale,
        aufgleispunkte,
        aufgleis_refs,
        extra_refs,
        str_element_nodes,
        ls_dateiname: ls_conv.file,
        outname_rel,
        rekursionstiefe,
    })
}

fn parse_aux_signal(
    paths: &ZusiPaths,
    reader: &mut LegacyReader<File>,
    elem_nr: u32,
    fahrstrsignale: &mut HashSet<u32>,
) -> Result<Option<AuxSignal>> {
    let fstrsig_x = match reader.read_float_str()? {
        Some(x) => x,
        None => return Ok(None),
    };
    fahrstrsignale.insert(elem_nr);

    let pos = (
        fstrsig_x,
        reader.read_float_str_required("fstrsig.Y")?,
        reader.read_float_str_required("fstrsig.Z")?,
    );
    let phi_x = reader.read_float_str_required("fstrsig phi.X")?;
    let phi_y = (-reader.read_float_required("fstrsig phi.Y")?).to_string();
    let phi_z = reader.read_float_str_required("fstrsig phi.Z")?;
    let phi = (phi_x, phi_y, phi_z);

    for _ in 0..6 {
        reader.read_line()?;
    }

    let sigframe_statisch = reader.read_line_required("static signal frame")?;
    let static_conv = landschaft::convert_scenery(paths, sigframe_statisch.trim(), true)?;
    let mut bounding_r = static_conv.bounding_r;
    reader.read_line()?; // ohne Funktion

    let marker = reader.read_line_required("signal frame marker")?;
    let (not_set_frame, set_frame) = if !marker.starts_with('#') {
        let not_set_conv = landschaft::convert_scenery(paths, marker.trim(), true)?;
        bounding_r = bounding_r.max(not_set_conv.bounding_r);
        reader.read_line()?; // ohne Funktion
        let sigframe_gestellt = reader.read_line_required("set signal frame")?;
        let set_conv = landschaft::convert_scenery(paths, sigframe_gestellt.trim(), true)?;
        bounding_r = bounding_r.max(set_conv.bounding_r);
        reader.read_line()?; // ohne Funktion
        reader.read_line()?; // Signalbilder-Endmarke
        (
            Some(AuxFrame { file: not_set_conv.file }),
            Some(AuxFrame { file: set_conv.file }),
        )
    } else {
        (None, None)
    };

    let fstrsig_er_nr = reader.read_u32("fstrsig event code")?;
    reader.read_line()?; // Am Signal angekündigte Geschwindigkeit
    let koppel = reader.read_u32("coupled element")?;
    let coupled_element = if koppel != 0 { Some(koppel) } else { None };

    Ok(Some(AuxSignal {
        pos,
        phi,
        static_frame: AuxFrame { file: static_conv.file },
        not_set_frame,
        set_frame,
        event_code: fstrsig_er_nr,
        coupled_element,
        bounding_r: bounding_r.ceil() as u32,
    }))
}

fn parse_combi_signal(paths: &ZusiPaths, reader: &mut LegacyReader<File>, elem_nr: u32) -> Result<Option<Signal>> {
    let x1 = match reader.read_float()? {
        Some(x) => x,
        None => return Ok(None),
    };
    let y1 = reader.read_float_required("signal y1")?;
    let z1 = reader.read_float_required("signal z1")?;
    let rx1 = reader.read_float_str_required("signal rx1")?;
    let ry1 = reader.read_float_str_required("signal ry1")?;
    let rz1 = reader.read_float_str_required("signal rz1")?;

    let x2 = reader.read_float_required("signal x2")?;
    let y2 = reader.read_float_required("signal y2")?;
    let z2 = reader.read_float_required("signal z2")?;
    let rx2 = reader.read_float_str_required("signal rx2")?;
    let ry2 = reader.read_float_str_required("signal ry2")?;
    let rz2 = reader.read_float_str_required("signal rz2")?;

    let (xo, yo, zo) = if x1 == 0.0 && y1 == 0.0 && z1 == 0.0 {
        (x2, y2, z2)
    } else if x2 == 0.0 && y2 == 0.0 && z2 == 0.0 {
        (x1, y1, z1)
    } else {
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0, (z1 + z2) / 2.0)
    };

    let mut frames = Vec::new();
    let mut bounding_r = 0.0_f64;
    loop {
        let lsdatei = reader.read_line_required("signal frame file")?;
        if lsdatei.starts_with('#') {
            break;
        }
        let conv = landschaft::convert_scenery(paths, lsdatei.trim(), true)?;
        bounding_r = bounding_r.max(conv.bounding_r);
        let mount = reader.read_line_required("signal frame mount point")?;
        let (pos, phi) = if mount.starts_with('2') {
            ((x2 - xo, y2 - yo, z2 - zo), (rx2.clone(), ry2.clone(), rz2.clone()))
        } else {
            ((x1 - xo, y1 - yo, z1 - zo), (rx1.clone(), ry1.clone(), rz1.clone()))
        };
        frames.push(model::CombiFrame { file: conv.file, pos, phi });
    }

    let block = reader.read_line_required("signal block name")?;
    let gleis = reader.read_line_required("signal track name")?;

    let numzeilen = reader.read_int("matrix row count")? as usize + 1;
    let numspalten = reader.read_int("matrix column count")? as usize + 1;

    let mut matrix = Vec::with_capacity(numzeilen);
    let mut seen_blocks = HashSet::new();
    for _ in 0..numzeilen {
        let row_block = reader.read_line_required("matrix destination block")?.trim().to_string();
        let row_gleis = reader.read_line_required("matrix destination track")?.trim().to_string();
        if !row_block.is_empty() || !row_gleis.is_empty() {
            let key = format!("{row_block} {row_gleis}");
            if !seen_blocks.insert(key) {
                log::warn!("signal at element {elem_nr}: duplicate destination {row_block} {row_gleis}");
            }
        }
        let vmax = reader.read_int("matrix row vMax")? as i32;
        reader.read_line()?;
        reader.read_line()?;
        matrix.push(MatrixRow {
            block: row_block,
            gleis: row_gleis,
            vmax,
            entries: Vec::with_capacity(numspalten),
        });
    }

    let mut vsig_geschw = Vec::with_capacity(numspalten);
    for _ in 0..numspalten {
        vsig_geschw.push(reader.read_int("pre-signal column speed")? as i32);
    }

    reader.read_line()?; // Aus bei Hp0

    for row in matrix.iter_mut().take(numzeilen) {
        for _ in 0..numspalten {
            let bild = reader.read_int("matrix entry aspect")? as i32;
            let vmax = reader.read_int("matrix entry vMax")? as i32;
            if vmax == 0 && row.vmax != 0 {
                log::warn!("element {elem_nr}: matrix entry v=0 but row v!=0");
            }
            let id = reader.read_int("matrix entry id")? as i32;
            let er1 = reader.read_int("matrix entry er1")? as i32;
            let er2 = reader.read_int("matrix entry er2")? as i32;
            reader.read_line()?;
            row.entries.push(MatrixEntry { bild, vmax, id, er1, er2 });
        }
    }

    reader.read_int("substitute signal aspect")?;
    reader.read_int("substitute signal vMax")?;
    reader.read_int("substitute signal id")?;
    reader.read_int("substitute signal er1")?;
    reader.read_int("substitute signal er2")?;
    reader.read_line()?; // reserved
    reader.read_line()?; // substitute signal probability

    let mut vsigs = Vec::new();
    loop {
        let line = reader.read_line_required("pre-signal element list")?;
        if line.starts_with('#') {
            break;
        }
        let nr = line
            .trim()
            .parse::<u32>()
            .map_err(|_| ConvertError::InvalidFloat { line: line.clone() })?;
        vsigs.push(nr);
    }
    reader.read_line()?; // reserved

    Ok(Some(Signal {
        element_nr: elem_nr,
        block: block.trim().to_string(),
        gleis: gleis.trim().to_string(),
        origin: (xo, yo, zo),
        frames,
        matrix,
        vsig_geschw,
        vsigs,
        bounding_r: bounding_r.ceil() as u32,
    }))
}

/// "Keine Fahrstraße einrichten" in the reverse direction never needs
/// emitting: the 3D editor doesn't synthesize routes here, this converter
/// does, so the three `InfoGegenRichtung` markers stay unreachable. Kept as
/// dead code rather than deleted, matching the upstream converter.
const EMIT_DISABLED_GEGENRICHTUNG_MARKERS: bool = false;

fn build_str_element_node(element: &TrackElement, outname_rel: &str) -> Element {
    let mut str_element = Element::new("StrElement")
        .attr("Nr", element.nr.to_string())
        .attr("Anschluss", (0xFF00_u32).to_string())
        .attr("Ueberh", element.ueberh.clone());

    if EMIT_DISABLED_GEGENRICHTUNG_MARKERS {
        str_element.push_child(
            Element::new("InfoGegenRichtung")
                .child(Element::new("Ereignis").attr("Er", "21"))
                .child(Element::new("Ereignis").attr("Er", "22"))
                .child(Element::new("Ereignis").attr("Er", "45")),
        );
    }

    let mut info_norm = Element::new("InfoNormRichtung").attr("km", element.km.to_string());
    if element.direction_positive {
        info_norm.set_attr("pos", "1");
    }
    info_norm.set_attr("vMax", element.vmax.to_string());
    if let Some(reg) = element.register {
        info_norm.set_attr("Reg", reg.to_string());
    }
    if let Some(ev) = event_xml(element.event) {
        info_norm.push_child(ev);
    }
    if let Some(sig) = &element.signal {
        info_norm.push_child(build_combi_signal_node(sig));
    }
    str_element.push_child(info_norm);

    str_element.push_child(
        Element::new("g")
            .attr("X", element.g.0.clone())
            .attr("Y", element.g.1.clone())
            .attr("Z", element.g.2.clone()),
    );
    str_element.push_child(
        Element::new("b")
            .attr("X", element.b.0.clone())
            .attr("Y", element.b.1.clone())
            .attr("Z", element.b.2.clone()),
    );

    for &succ in &element.successors {
        str_element.push_child(Element::new("NachNorm").attr("Nr", succ.to_string()));
    }

    if let Some(aux) = &element.aux_signal {
        str_element.push_child(build_aux_signal_node(aux, outname_rel));
    }

    str_element
}

fn build_combi_signal_node(sig: &Signal) -> Element {
    let mut node = Element::new("Signal").attr("BoundingR", sig.bounding_r.to_string());
    if sig.is_named() {
        node.set_attr("NameBetriebsstelle", sig.block.clone());
        node.set_attr("Stellwerk", sig.block.clone());
        node.set_attr("Signalname", sig.gleis.clone());
    } else {
        node.set_attr("Signalname", format!("Element {}", sig.element_nr));
    }

    node.push_child(
        Element::new("p")
            .attr("X", sig.origin.0.to_string())
            .attr("Y", sig.origin.1.to_string())
            .attr("Z", sig.origin.2.to_string()),
    );

    for row in &sig.matrix {
        let hsig_geschw = if row.vmax == 0 { "0".to_string() } else { (row.vmax as f64 / 3.6).to_string() };
        node.push_child(
            Element::new("HsigBegriff")
                .attr("FahrstrTyp", "6")
                .attr("HsigGeschw", hsig_geschw),
        );
    }
    for &vsig_geschw in &sig.vsig_geschw {
        let value = if vsig_geschw == -1 { "-1".to_string() } else { (vsig_geschw as f64 / 3.6).to_string() };
        node.push_child(Element::new("VsigBegriff").attr("VsigGeschw", value));
    }
    for row in &sig.matrix {
        for entry in &row.entries {
            let value = if entry.vmax == -1 { "-1".to_string() } else { (entry.vmax as f64 / 3.6).to_string() };
            node.push_child(
                Element::new("MatrixEintrag")
                    .attr("MatrixGeschw", value)
                    .attr("Signalbild", entry.bild.to_string()),
            );
        }
    }
    for frame in &sig.frames {
        node.push_child(
            Element::new("SignalFrame")
                .child(Element::new("Datei").attr("Dateiname", frame.file.clone()))
                .child(
                    Element::new("p")
                        .attr("X", frame.pos.0.to_string())
                        .attr("Y", frame.pos.1.to_string())
                        .attr("Z", frame.pos.2.to_string()),
                )
                .child(
                    Element::new("phi")
                        .attr("X", frame.phi.0.clone())
                        .attr("Y", frame.phi.1.clone())
                        .attr("Z", frame.phi.2.clone()),
                ),
        );
    }

    node
}

fn build_aux_signal_node(aux: &AuxSignal, outname_rel: &str) -> Element {
    let mut signal = Element::new("Signal")
        .attr("SignalFlags", "9")
        .attr("BoundingR", aux.bounding_r.to_string())
        .child(
            Element::new("p")
                .attr("X", aux.pos.0.clone())
                .attr("Y", aux.pos.1.clone())
                .attr("Z", aux.pos.2.clone()),
        )
        .child(
            Element::new("phi")
                .attr("X", aux.phi.0.clone())
                .attr("Y", aux.phi.1.clone())
                .attr("Z", aux.phi.2.clone()),
        )
        .child(
            Element::new("SignalFrame").child(Element::new("Datei").attr("Dateiname", aux.static_frame.file.clone())),
        );

    if let (Some(not_set), Some(set)) = (&aux.not_set_frame, &aux.set_frame) {
        signal.push_child(
            Element::new("SignalFrame").child(Element::new("Datei").attr("Dateiname", not_set.file.clone())),
        );
        signal.push_child(Element::new("SignalFrame").child(Element::new("Datei").attr("Dateiname", set.file.clone())));
    }

    signal.push_child(Element::new("HsigBegriff").attr("FahrstrTyp", "1"));
    signal.push_child(
        Element::new("HsigBegriff")
            .attr("HsigGeschw", "-1")
            .attr("FahrstrTyp", "1"),
    );
    signal.push_child(Element::new("VsigBegriff").attr("VsigGeschw", "-1"));

    let mut me1 = Element::new("MatrixEintrag").attr("MatrixGeschw", "-1").attr("Signalbild", "3");
    if let Some(ev) = event_xml(Event::decode(aux.event_code)) {
        me1.push_child(ev);
    }
    signal.push_child(me1);

    let mut me2 = Element::new("MatrixEintrag").attr("MatrixGeschw", "-1").attr("Signalbild", "5");
    if let Some(ev) = event_xml(Event::decode(aux.event_code)) {
        me2.push_child(ev);
    }
    signal.push_child(me2);

    if let Some(coupled) = aux.coupled_element {
        signal.push_child(
            Element::new("KoppelSignal")
                .attr(
                    "ReferenzNr",
                    model::ref_number(coupled, model::ReferenceKind::SignalReverse).to_string(),
                )
                .child(Element::new("Datei").attr("Dateiname", outname_rel).attr("NurInfo", "1")),
        );
    }

    Element::new("InfoGegenRichtung").child(signal)
}
