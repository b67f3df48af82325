//! Route ("Fahrstraße") synthesis: a DFS over the parsed track graph that
//! emits one `<Fahrstrasse>` element per reachable main-signal or
//! staging-point start. Ported from `strecke.py`'s `get_fahrstr_rek` and
//! `get_aufloesepunkte_rek`.
//!
//! Python's versions are closures over the enclosing `conv_str` locals
//! (`elements`, `signale`, ...) that mutate a shared `ET.Element` tree in
//! place. Here that shared read-only state is a borrowed [`RouteState`], and
//! the in-place mutation becomes an owned `Element` threaded through the
//! recursion, cloned only at the points the original calls
//! `copy.deepcopy` (a real switch with more than one successor).

use std::collections::{HashMap, HashSet};

use model::{ReferenceKind, Signal, TrackElement, ref_number};
use xmltree::Element;

use crate::refs::ref_link_with;

pub struct RouteState<'a> {
    pub elements: &'a HashMap<u32, TrackElement>,
    pub signale: &'a HashMap<u32, Signal>,
    pub anonyme_signale: &'a HashMap<u32, Signal>,
    pub fahrstrsignale: &'a HashSet<u32>,
    pub aufgleispunkte: &'a [u32],
    pub signal_order: &'a [u32],
    pub outname_rel: &'a str,
}

/// Seeds one route walk per main signal (a named signal with a stop row) and
/// one per staging point, in the order they were read from the file.
/// Mirrors the two seeding loops at the end of `conv_str`.
pub fn seed_routes(state: &RouteState) -> Vec<Element> {
    let mut routes = Vec::new();

    for &elnr in state.signal_order {
        let sig = &state.signale[&elnr];
        if !sig.is_main_signal() {
            continue;
        }
        log::info!("{} {}", sig.block, sig.gleis);
        let mut route = Element::new("Fahrstrasse");
        route.push_child(ref_link_with(
            "FahrstrStart",
            &[],
            ref_number(elnr, ReferenceKind::Signal),
            state.outname_rel,
        ));
        walk_route(state, vec![elnr], elnr, route, &mut routes);
    }

    for &elnr in state.aufgleispunkte {
        log::info!("Aufgleispunkt {elnr}");
        let mut route = Element::new("Fahrstrasse");
        route.push_child(ref_link_with(
            "FahrstrStart",
            &[],
            ref_number(elnr, ReferenceKind::Staging),
            state.outname_rel,
        ));
        walk_route(state, vec![elnr], elnr, route, &mut routes);
    }

    routes
}

/// `get_aufloesepunkte_rek`: walks forward from `elnr` looking for the first
/// release point (or main-signal stop) on every branch, emitting
/// `<FahrstrAufloesung>` for each one found.
///
/// The recursive call below reproduces the original's argument order
/// exactly, including what reads as a swap of `elnr`/`startnr`
/// (`get_aufloesepunkte_rek(startnr, succs[idx], n_fahrstrasse)` against a
/// `(elnr, startnr, ...)` signature): branches past the first successor walk
/// from the outer start element rather than from the branch's own head. This
/// looks unintentional but has no externally visible effect beyond a
/// possible duplicate `<FahrstrAufloesung>` on a re-converged branch, so it's
/// kept rather than "fixed".
pub fn walk_release_points(state: &RouteState, mut elnr: u32, startnr: u32, route: &mut Element) {
    loop {
        let element = &state.elements[&elnr];
        if elnr != startnr {
            if element.is_release_point() {
                route.push_child(ref_link_with(
                    "FahrstrAufloesung",
                    &[],
                    ref_number(elnr, ReferenceKind::Release),
                    state.outname_rel,
                ));
                return;
            }
            if let Some(sig) = state.signale.get(&elnr) {
                if sig.is_main_signal() {
                    return;
                }
            }
        }

        if element.successors.is_empty() {
            return;
        }
        for &succ in &element.successors[1..] {
            walk_release_points(state, startnr, succ, route);
        }
        elnr = element.successors[0];
    }
}

/// `get_fahrstr_rek`: the route DFS proper. `startnrs` is the chain of
/// signals (or the one staging point) this route has departed from so far,
/// growing only when a main signal is passed through at a signaled speed of
/// zero (§4.5, "signal chaining").
fn walk_route(state: &RouteState, startnrs: Vec<u32>, mut elnr: u32, mut route: Element, routes_out: &mut Vec<Element>) {
    loop {
        let element = &state.elements[&elnr];
        let start = *startnrs.last().expect("route always has a start element");

        if elnr != start {
            if element.register.is_some() {
                route.push_child(ref_link_with(
                    "FahrstrRegister",
                    &[],
                    ref_number(elnr, ReferenceKind::Register),
                    state.outname_rel,
                ));
            }
            if element.is_release_point() {
                route.push_child(ref_link_with(
                    "FahrstrTeilaufloesung",
                    &[],
                    ref_number(elnr, ReferenceKind::Release),
                    state.outname_rel,
                ));
            }
            if state.fahrstrsignale.contains(&elnr) {
                route.push_child(ref_link_with(
                    "FahrstrSignal",
                    &[("FahrstrSignalZeile", "1".to_string())],
                    ref_number(elnr, ReferenceKind::SignalReverse),
                    state.outname_rel,
                ));
            }

            if let Some(sig) = state.signale.get(&elnr) {
                let zeile_v0 = sig.stop_row();
                route.push_child(ref_link_with(
                    "FahrstrSignal",
                    &[("FahrstrSignalZeile", zeile_v0.to_string())],
                    ref_number(elnr, ReferenceKind::Signal),
                    state.outname_rel,
                ));

                if let Some(startsig) = state.signale.get(&start) {
                    let found = startsig
                        .matrix
                        .iter()
                        .enumerate()
                        .find(|(_, mz)| mz.block == sig.block && mz.gleis == sig.gleis);

                    let (idx, mz) = match found {
                        Some(hit) => hit,
                        None => {
                            log::warn!(
                                "{start}: no row for route to {elnr} ({} {}) found",
                                sig.block,
                                sig.gleis
                            );
                            return;
                        }
                    };

                    route.push_child(ref_link_with(
                        "FahrstrSignal",
                        &[("FahrstrSignalZeile", idx.to_string())],
                        ref_number(start, ReferenceKind::Signal),
                        state.outname_rel,
                    ));

                    let mut hsig_geschw = None;
                    let mut id = 0;
                    for (spalte, &column_speed) in startsig.vsig_geschw.iter().enumerate() {
                        if column_speed == 0 {
                            hsig_geschw = Some(mz.entries[spalte].vmax);
                            id = mz.entries[spalte].id;
                            break;
                        }
                    }
                    let hsig_geschw = hsig_geschw.unwrap_or_else(|| {
                        id = mz.entries[0].id;
                        mz.entries[0].vmax
                    });

                    for &vsig_nr in &startsig.vsigs {
                        let vsig = state
                            .signale
                            .get(&vsig_nr)
                            .or_else(|| state.anonyme_signale.get(&vsig_nr));
                        let vsig = match vsig {
                            Some(v) => v,
                            None => {
                                log::warn!("no pre-signal at element {vsig_nr}");
                                continue;
                            }
                        };
                        route.push_child(ref_link_with(
                            "FahrstrVSignal",
                            &[("FahrstrSignalSpalte", vsig.vsig_column(hsig_geschw, id).to_string())],
                            ref_number(vsig_nr, ReferenceKind::Signal),
                            state.outname_rel,
                        ));
                    }

                    if hsig_geschw == 0 {
                        log::info!(" -> {} {}: vmax == 0 -> weiter", sig.block, sig.gleis);
                        let mut startnrs = startnrs;
                        startnrs.push(elnr);
                        walk_route(state, startnrs, elnr, route, routes_out);
                        return;
                    }
                }

                route.push_child(ref_link_with(
                    "FahrstrZiel",
                    &[],
                    ref_number(elnr, ReferenceKind::Signal),
                    state.outname_rel,
                ));

                let mut fname = String::new();
                for &startnr in &startnrs {
                    match state.signale.get(&startnr) {
                        Some(startsig) => fname.push_str(&format!("{} {} -> ", startsig.block, startsig.gleis)),
                        None => fname.push_str("Aufgleispunkt -> "),
                    }
                }
                fname.push_str(&format!("{} {}", sig.block, sig.gleis));
                route.set_attr("FahrstrName", fname.clone());

                walk_release_points(state, elnr, elnr, &mut route);

                route.set_attr("FahrstrTyp", "TypZug");
                log::info!(" -> {fname}");
                routes_out.push(route);
                return;
            }
        }

        let succs = element.successors.clone();
        if succs.len() == 1 {
            let succ = succs[0];
            emit_reverse_switch_ref(state, &mut route, elnr, succ);
            elnr = succ;
            continue;
        }

        for (idx, &succ) in succs.iter().enumerate() {
            let mut branch = route.clone();
            emit_reverse_switch_ref(state, &mut branch, elnr, succ);
            branch.push_child(ref_link_with(
                "FahrstrWeiche",
                &[("FahrstrWeichenlage", (idx + 1).to_string())],
                ref_number(elnr, ReferenceKind::Switch),
                state.outname_rel,
            ));
            walk_route(state, startnrs.clone(), succ, branch, routes_out);
        }
        return;
    }
}

fn emit_reverse_switch_ref(state: &RouteState, route: &mut Element, elnr: u32, succ: u32) {
    let succ_preds = &state.elements[&succ].predecessors;
    if succ_preds.len() > 1 {
        let lage = succ_preds.iter().position(|&p| p == elnr).expect("elnr is succ's predecessor") + 1;
        route.push_child(ref_link_with(
            "FahrstrWeiche",
            &[("FahrstrWeichenlage", lage.to_string())],
            ref_number(succ, ReferenceKind::SwitchReverse),
            state.outname_rel,
        ));
    }
}
