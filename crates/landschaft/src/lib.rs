//! Scenery ("Landschaft") converter: recursively lifts a v2 `.ls` file and
//! every file it links to into a v3 `.ls3` XML wrapper, re-centering each
//! linked item's element geometry around its own origin. Ported in full
//! from `landschaft.py`.

use std::fs;
use std::fs::File;
use std::io::Write as _;

use model::{ConvertError, Result};
use util::{LegacyReader, ZusiPaths};
use xmltree::Element;

/// One scenery link: a file to embed, its position/rotation relative to the
/// parent, and the combined bounding radius of everything inside it.
#[derive(Debug, Clone)]
pub struct VerknParameter {
    pub file: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub bounding_r: f64,
}

struct RawElement {
    c: i64,
    cnight: i64,
    blink: String,
    render_typ: i64,
    vertices: Vec<(f64, f64, f64)>,
}

fn format_comma(v: f64) -> String {
    format!("{v}").replace('.', ",")
}

/// Re-centers a scenery file's raw element geometry around the bounding box
/// of all of its vertices and writes it back out in the same legacy text
/// format (§4.3). Ported from `conv_ls_elemente`.
fn convert_elements(
    paths: &ZusiPaths,
    reader: &mut LegacyReader<File>,
    num_elements: u32,
    filename: &str,
) -> Result<VerknParameter> {
    let outname_rel = paths.z2rel_to_z3rel(filename);
    let outname_abs = paths.z3rel_to_abs(&outname_rel);
    log::info!("conv_ls_elemente {filename} -> {}", outname_abs.display());
    if let Some(parent) = outname_abs.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(&outname_abs)?;
    write!(out, "2.3\r\n{num_elements}\r\n#\r\n")?;

    let mut elements = Vec::new();
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for _ in 0..num_elements {
        let vertex_count = reader.read_int("element vertex count")?;
        if vertex_count == 0 {
            // Lichtquelle: 11 unrelated lines, skipped entirely.
            for _ in 0..11 {
                reader.read_line()?;
            }
            continue;
        }
        reader.read_line()?;

        let mut vertices = Vec::with_capacity(vertex_count as usize);
        for _ in 0..vertex_count {
            let x = reader.read_float_required("vertex x")?;
            let y = reader.read_float_required("vertex y")?;
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            let z = reader.read_float_required("vertex z")?;
            vertices.push((x, y, z));
        }

        let c = reader.read_int("element color")?;
        let cnight = reader.read_int("element night color")?;
        let blink = reader.read_float_str_required("blink period")?;
        reader.read_line()?;
        let render_typ = reader.read_int("render type")?;
        reader.read_line()?;
        reader.read_line()?;

        elements.push(RawElement {
            c,
            cnight,
            blink,
            render_typ,
            vertices,
        });
    }

    let center_x = (max_x + min_x) / 2.0;
    let center_y = (max_y + min_y) / 2.0;
    let mut bounding_r_sq = 0.0_f64;

    for element in &elements {
        write!(out, "{}\r\n#\r\n", element.vertices.len())?;
        for &(x, y, z) in &element.vertices {
            let local_x = x - center_x;
            let local_y = y - center_y;
            bounding_r_sq = bounding_r_sq.max(local_x * local_x + local_y * local_y);
            write!(
                out,
                "{}\r\n{}\r\n{}\r\n",
                format_comma(local_x),
                format_comma(local_y),
                format_comma(z)
            )?;
        }
        write!(
            out,
            "{}\r\n{}\r\n{}\r\n0\r\n{}\r\n#\r\n#\r\n",
            element.c, element.cnight, element.blink, element.render_typ
        )?;
    }

    log::info!(
        "conv_ls_elemente: #elemente={} centerx={center_x} centery={center_y} boundingr={}",
        elements.len(),
        bounding_r_sq.sqrt()
    );

    Ok(VerknParameter {
        file: outname_rel,
        x: center_x,
        y: center_y,
        z: 0.0,
        rx: 0.0,
        ry: 0.0,
        rz: 0.0,
        bounding_r: bounding_r_sq.sqrt(),
    })
}

/// Converts a v2 scenery file (and everything it links to, recursively) into
/// a v3 `.ls3` XML wrapper. When `no_displacement` is set and the output
/// already exists, the previous conversion is trusted and only its combined
/// bounding radius is read back, per the cache contract in `conv_ls`.
pub fn convert_scenery(paths: &ZusiPaths, filename: &str, no_displacement: bool) -> Result<VerknParameter> {
    if filename.len() < 3 {
        return Err(ConvertError::UnexpectedEof {
            context: "scenery filename too short to have an extension",
        });
    }
    let stem = &filename[..filename.len() - 3];
    let outname_rel = format!(
        "{}{}.ls3",
        paths.z2rel_to_z3rel(stem),
        if no_displacement { ".nd" } else { "" }
    );
    let outname_abs = paths.z3rel_to_abs(&outname_rel);

    if no_displacement && outname_abs.exists() {
        let xml = fs::read_to_string(&outname_abs)?;
        let bounding_r = xmltree::max_bounding_r(&xml).unwrap_or(0.0);
        return Ok(VerknParameter {
            file: outname_rel,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            bounding_r,
        });
    }

    log::info!("conv_ls {filename} -> {}", outname_abs.display());
    if let Some(parent) = outname_abs.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut verknuepfungen = Vec::new();
    {
        let z2_path = paths.z2rel_to_abs(filename);
        let file = File::open(&z2_path)?;
        let mut reader = LegacyReader::new(file);
        reader.read_line()?; // version marker, not validated by the original either
        let num_elements = reader.read_u32("element count")?;

        loop {
            let datei = reader.read_line_required("linked scenery entry")?;
            let datei = datei.trim();
            if datei == "#" {
                break;
            }
            let linked = convert_scenery(paths, datei, false)?;

            let x = reader.read_float_required("link x")?;
            let y = reader.read_float_required("link y")?;
            let z = reader.read_float_required("link z")?;
            let rx = reader.read_float_required("link rx")?;
            let ry = reader.read_float_required("link ry")?;
            let rz = reader.read_float_required("link rz")?;

            let (rot_x, rot_y, rot_z) =
                util::geo::rotate_zyx((linked.x, linked.y, linked.z), (rx, ry, rz));

            verknuepfungen.push(VerknParameter {
                file: linked.file,
                x: rot_x + x,
                y: rot_y + y,
                z: rot_z + z,
                rx,
                ry,
                rz,
                bounding_r: linked.bounding_r,
            });
        }

        if num_elements != 0 {
            verknuepfungen.push(convert_elements(paths, &mut reader, num_elements, filename)?);
        }
    }

    let bounding_items: Vec<(f64, f64, f64)> =
        verknuepfungen.iter().map(|v| (v.x, v.y, v.bounding_r)).collect();

    let (center_x, center_y) = if verknuepfungen.is_empty() || no_displacement {
        (0.0, 0.0)
    } else {
        util::geo::bounding_center(&bounding_items)
    };

    let bounding_r = if verknuepfungen.is_empty() {
        0.0
    } else {
        util::geo::bounding_radius_at(&bounding_items, (center_x, center_y))
    };

    let mut landschaft_el = Element::new("Landschaft");
    for verkn in &verknuepfungen {
        let node = Element::new("Verknuepfte")
            .attr("SichtbarBis", "3000")
            .attr("BoundingR", verkn.bounding_r.to_string())
            .child(Element::new("Datei").attr("Dateiname", verkn.file.clone()))
            .child(
                Element::new("p")
                    .attr("X", (verkn.x - center_x).to_string())
                    .attr("Y", (verkn.y - center_y).to_string())
                    .attr("Z", verkn.z.to_string()),
            )
            .child(
                Element::new("phi")
                    .attr("X", verkn.rx.to_string())
                    .attr("Y", verkn.ry.to_string())
                    .attr("Z", verkn.rz.to_string()),
            );
        landschaft_el.push_child(node);
    }

    let root = Element::new("Zusi").child(landschaft_el);
    xmltree::Document::new(root).write_to_file(&outname_abs)?;

    log::info!("conv_ls {filename}: centerx={center_x} centery={center_y} boundingr={bounding_r}");

    Ok(VerknParameter {
        file: outname_rel,
        x: center_x,
        y: center_y,
        z: 0.0,
        rx: 0.0,
        ry: 0.0,
        rz: 0.0,
        bounding_r,
    })
}
