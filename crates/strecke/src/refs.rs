//! Reference-point XML and the event-code-to-`<Ereignis>` lift, both needed
//! by parsing and by route synthesis. Ported from `strecke.py`'s
//! `allocate_refpunkt` and `conv_ereignis`.

use model::{ref_number, Event, ReferenceKind};
use xmltree::Element;

/// `allocate_refpunkt`: a `<ReferenzElemente>` record for one reference point.
pub fn allocate_refpunkt(elem_nr: u32, kind: ReferenceKind) -> Element {
    let mut el = Element::new("ReferenzElemente")
        .attr("ReferenzNr", ref_number(elem_nr, kind).to_string())
        .attr("StrElement", elem_nr.to_string())
        .attr("RefTyp", kind.emitted_type_code().to_string());
    if !kind.is_reverse() {
        el = el.attr("StrNorm", "1");
    }
    el
}

/// A `<FooRef Ref="..."><Datei Dateiname="self" NurInfo="1"/></FooRef>`
/// pointer back into this same file, the shape every route binding uses.
pub fn ref_link(tag: &str, refnr: u32, self_file: &str) -> Element {
    Element::new(tag)
        .attr("Ref", refnr.to_string())
        .child(Element::new("Datei").attr("Dateiname", self_file).attr("NurInfo", "1"))
}

/// Same as [`ref_link`] with extra attributes set before `Ref` (attribute
/// order mirrors the original's dict-literal construction).
pub fn ref_link_with(tag: &str, extra: &[(&str, String)], refnr: u32, self_file: &str) -> Element {
    let mut el = Element::new(tag);
    for (key, value) in extra {
        el.set_attr(*key, value.clone());
    }
    el.set_attr("Ref", refnr.to_string());
    el.push_child(Element::new("Datei").attr("Dateiname", self_file).attr("NurInfo", "1"));
    el
}

/// `conv_ereignis`: lifts a decoded event into the `<Ereignis>` node it
/// materializes as, if any (most codes, including the release marker, have
/// no v3 node of their own).
pub fn event_xml(event: Option<Event>) -> Option<Element> {
    match event? {
        Event::ConditionalDerailment { speed_kph } => Some(
            Element::new("Ereignis")
                .attr("Er", "1")
                .attr("Wert", (speed_kph as f64 / 3.6).to_string()),
        ),
        Event::Pzb500 => Some(Element::new("Ereignis").attr("Er", "500")),
        Event::Pzb1000 => Some(Element::new("Ereignis").attr("Er", "1000")),
        Event::ConditionalPzb1000 { threshold_kph } => Some(
            Element::new("Ereignis")
                .attr("Er", "1000")
                .attr("Wert", threshold_kph.to_string()),
        ),
        Event::Pzb2000 => Some(Element::new("Ereignis").attr("Er", "2000")),
        Event::ConditionalPzb2000 { threshold_kph } => Some(
            Element::new("Ereignis")
                .attr("Er", "2000")
                .attr("Wert", threshold_kph.to_string()),
        ),
        Event::ReleaseMarker | Event::Unmapped(_) => None,
    }
}
