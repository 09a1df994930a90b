//! Cross-pass scenarios: normalization, rewriting and chain packing run
//! together on small register and LUT netlists.

use std::collections::BTreeSet;
use tilepack_arch::{ChainFabric, ConfiguredFabric};
use tilepack_common::{Interner, LogicVec};
use tilepack_config::{load_config_from_str, PackConfig};
use tilepack_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use tilepack_netlist::{Cell, CellId, CellRole, ConstValue, Netlist, ParamValue, PortDirection};
use tilepack_pack::{
    carry_navigators, check_cluster, cluster_views, find_chains, generic_xform, normalize,
    pack_chains, run_passes, trace_chain, ChainPackPass, NormalizeOptions, NormalizePass,
    RuleSet, BOUNDARY_ROLE_ATTR,
};

const REGISTERS: &str = r#"
[chain]
tile_capacity = 8
chain_in = "D"
chain_out = "Q"
cell_types = ["DFF"]
compat_ports = ["CLK"]

[boundary.feed_in]
cell_type = "CHAIN_IN"
input = "I"
chain_output = "O"

[boundary.pass_through]
cell_type = "CHAIN_PASS"
input = "I"
chain_output = "Q"
fabric_output = "O"

[boundary.pass_out]
cell_type = "CHAIN_OUT"
input = "I"
fabric_output = "O"

[lut.LUT4]
param = "INIT"
inputs = ["I0", "I1", "I2", "I3"]

[normalize]
keep_types = ["OBUF"]
vcc_driver_types = ["VCC"]

[rules.FD1S3AX]
new_type = "DFF"
port_rename = { DI = "D", QO = "Q" }
fixed_params = { GSR = "DISABLED" }
"#;

fn config() -> PackConfig {
    load_config_from_str(REGISTERS).unwrap()
}

fn fabric(interner: &Interner) -> ConfiguredFabric {
    ConfiguredFabric::from_config(&config(), interner).unwrap()
}

/// Adds `n` registers linked Q -> D. Every reset and the head's D are tied
/// low; all registers share one clock.
fn add_registers(nl: &mut Netlist<'_>, prefix: &str, n: usize) -> Vec<CellId> {
    let interner = nl.interner;
    let i = |s: &str| interner.get_or_intern(s);
    let gnd = nl.constant_net(ConstValue::Zero);
    let clk = match nl.find_net("clk") {
        Some(net) => net,
        None => nl.create_net("clk"),
    };
    let mut regs = Vec::new();
    let mut d_net = gnd;
    for k in 0..n {
        let r = nl.create_cell(i("DFF"), format!("{prefix}{k}"));
        let ports = [
            ("D", PortDirection::In),
            ("Q", PortDirection::Out),
            ("R", PortDirection::In),
            ("CLK", PortDirection::In),
        ];
        for (port, dir) in ports {
            nl.add_port(r, i(port), dir).unwrap();
        }
        nl.connect(r, i("D"), d_net).unwrap();
        nl.connect(r, i("R"), gnd).unwrap();
        nl.connect(r, i("CLK"), clk).unwrap();
        if k + 1 < n {
            d_net = nl.create_net(format!("{prefix}{k}_q"));
            nl.connect(r, i("Q"), d_net).unwrap();
        }
        regs.push(r);
    }
    regs
}

/// Drives an output buffer from the last register so it is observable.
fn observe(nl: &mut Netlist<'_>, cell: CellId) {
    let interner = nl.interner;
    let i = |s: &str| interner.get_or_intern(s);
    let name = format!("{}_out", nl.cell(cell).name);
    let net = nl.create_net(name.clone());
    nl.connect(cell, i("Q"), net).unwrap();
    let obuf = nl.create_cell(i("OBUF"), format!("{name}_buf"));
    nl.add_port(obuf, i("I"), PortDirection::In).unwrap();
    nl.connect(obuf, i("I"), net).unwrap();
}

fn roles(nl: &Netlist<'_>, role: CellRole) -> usize {
    nl.cells().filter(|(_, c)| c.role == role).count()
}

#[test]
fn ten_registers_split_into_eight_and_two() {
    let interner = Interner::new();
    let fabric = fabric(&interner);
    let mut nl = Netlist::new(&interner);
    let regs = add_registers(&mut nl, "r", 10);

    let nav = carry_navigators(fabric.chain_in(), fabric.chain_out(), |c: &Cell| {
        fabric.is_chain_cell(c)
    });
    let sink = DiagnosticSink::new();
    let chains = find_chains(
        &nl,
        |c| fabric.is_chain_cell(c),
        |n, c| nav.previous(n, c),
        |n, c| nav.next(n, c),
        1,
        &sink,
    );
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].cells, regs);

    let segments = pack_chains(&mut nl, &fabric, &sink).unwrap();
    let logical: Vec<usize> = segments.iter().map(|s| s.logical_len()).collect();
    assert_eq!(logical, vec![8, 2]);
    // No feed-in at the head: its chain input is a constant.
    assert_eq!(segments[0].root(), Some(regs[0]));
    assert_eq!(roles(&nl, CellRole::PassOut), 1);
    assert_eq!(roles(&nl, CellRole::FeedIn), 1);
    assert_eq!(roles(&nl, CellRole::PassThrough), 0);
    assert_eq!(nl.cell_count(), 12);

    let po = *segments[0].members.last().unwrap();
    let fi = segments[1].members[0];
    let marker = interner.get_or_intern(BOUNDARY_ROLE_ATTR);
    assert_eq!(nl.cell(po).attrs[&marker], ParamValue::Str("pass-out".into()));
    assert_eq!(nl.cell(fi).attrs[&marker], ParamValue::Str("feed-in".into()));

    let rendered = TerminalRenderer::new(false).render(&sink.take_all()[0]);
    assert_eq!(rendered, "note[N301]: Found chain of 10 cells starting at r0\n");
}

#[test]
fn legalized_chain_traces_back_to_original_order() {
    let interner = Interner::new();
    let fabric = fabric(&interner);
    let mut nl = Netlist::new(&interner);
    let regs = add_registers(&mut nl, "r", 19);
    // Interior fan-out forces a pass-through as well as the splits.
    let i = |s: &str| interner.get_or_intern(s);
    let tap = nl.create_cell(i("OBUF"), "tap");
    nl.add_port(tap, i("I"), PortDirection::In).unwrap();
    let q3 = nl.find_net("r3_q").unwrap();
    nl.connect(tap, i("I"), q3).unwrap();

    pack_chains(&mut nl, &fabric, &DiagnosticSink::new()).unwrap();
    assert_eq!(roles(&nl, CellRole::PassThrough), 1);
    assert_eq!(trace_chain(&nl, &fabric, regs[0]), regs);
}

#[test]
fn segments_respect_capacity_and_clusters_are_consistent() {
    let interner = Interner::new();
    let fabric = fabric(&interner);
    let mut nl = Netlist::new(&interner);
    add_registers(&mut nl, "r", 21);

    let segments = pack_chains(&mut nl, &fabric, &DiagnosticSink::new()).unwrap();
    assert_eq!(segments.len(), 3);
    for segment in &segments {
        assert!(segment.logical_len() <= fabric.tile_capacity());
        let root = segment.root().unwrap();
        check_cluster(&nl, root).unwrap();
    }

    let views = cluster_views(&nl);
    assert_eq!(views.len(), segments.len());
    for (view, segment) in views.iter().zip(&segments) {
        assert_eq!(view.root, segment.members[0]);
        let members: Vec<CellId> = view.members.iter().map(|&(c, _)| c).collect();
        assert_eq!(members, segment.members[1..]);
        for (_, offset) in &view.members {
            assert!(offset.abs_z);
            assert!((0..8).contains(&offset.dz));
        }
    }
}

#[test]
fn discovered_chains_are_disjoint() {
    let interner = Interner::new();
    let fabric = fabric(&interner);
    let mut nl = Netlist::new(&interner);
    let a = add_registers(&mut nl, "a", 5);
    let b = add_registers(&mut nl, "b", 1);
    let c = add_registers(&mut nl, "c", 3);

    let nav = carry_navigators(fabric.chain_in(), fabric.chain_out(), |c: &Cell| {
        fabric.is_chain_cell(c)
    });
    let chains = find_chains(
        &nl,
        |c| fabric.is_chain_cell(c),
        |n, c| nav.previous(n, c),
        |n, c| nav.next(n, c),
        2,
        &DiagnosticSink::new(),
    );
    assert_eq!(chains.len(), 2);
    let mut seen = BTreeSet::new();
    for chain in &chains {
        for &cell in &chain.cells {
            assert!(seen.insert(cell));
        }
    }
    let expected: BTreeSet<CellId> = a.iter().chain(&c).copied().collect();
    assert_eq!(seen, expected);
    assert!(!seen.contains(&b[0]));
}

#[test]
fn lut4_inputs_tied_high_fold_by_row_doubling() {
    let interner = Interner::new();
    let i = |s: &str| interner.get_or_intern(s);
    let mut nl = Netlist::new(&interner);

    let vcc = nl.create_cell(i("VCC"), "vcc");
    nl.add_port(vcc, i("Y"), PortDirection::Out).unwrap();
    let high = nl.create_net("high");
    nl.connect(vcc, i("Y"), high).unwrap();

    let mut luts = Vec::new();
    let inits = [ParamValue::Int(0x8000), ParamValue::parse("0x6996")];
    for (k, init) in inits.into_iter().enumerate() {
        let lut = nl.create_cell(i("LUT4"), format!("l{k}"));
        for port in ["I0", "I1", "I2", "I3"] {
            nl.add_port(lut, i(port), PortDirection::In).unwrap();
        }
        nl.add_port(lut, i("Z"), PortDirection::Out).unwrap();
        nl.cell_mut(lut).params.insert(i("INIT"), init);
        for port in ["I0", "I1", "I2"] {
            let net = match nl.find_net(port) {
                Some(net) => net,
                None => nl.create_net(port),
            };
            nl.connect(lut, i(port), net).unwrap();
        }
        nl.connect(lut, i("I3"), high).unwrap();
        let out = nl.create_net(format!("z{k}"));
        nl.connect(lut, i("Z"), out).unwrap();
        let obuf = nl.create_cell(i("OBUF"), format!("o{k}"));
        nl.add_port(obuf, i("I"), PortDirection::In).unwrap();
        nl.connect(obuf, i("I"), out).unwrap();
        luts.push(lut);
    }

    let options = NormalizeOptions::from_config(&config(), &interner);
    let sink = DiagnosticSink::new();
    let report = normalize(&mut nl, &options, &sink).unwrap();
    assert_eq!(report.merged_nets, 1);
    assert_eq!(report.folded_inputs, 2);
    assert_eq!(report.removed_cells, 1);

    assert_eq!(nl.cell(luts[0]).params[&i("INIT")], ParamValue::Int(0x8080));
    assert_eq!(
        nl.cell(luts[1]).params[&i("INIT")],
        ParamValue::Bits(LogicVec::from_hex_str("6969").unwrap())
    );
    for &lut in &luts {
        assert!(!nl.port_used(lut, i("I3")));
    }
    assert!(nl.find_cell("vcc").is_none());

    let before = nl.fingerprint();
    let again = normalize(&mut nl, &options, &sink).unwrap();
    assert!(again.is_empty());
    assert_eq!(nl.fingerprint(), before);
}

fn full_flow(interner: &Interner) -> (String, Vec<String>) {
    let config = config();
    let mut nl = Netlist::new(interner);
    let regs = add_registers(&mut nl, "r", 13);
    observe(&mut nl, regs[12]);
    let q5 = nl.find_net("r5_q").unwrap();
    let tap = nl.create_cell(interner.get_or_intern("OBUF"), "tap");
    nl.add_port(tap, interner.get_or_intern("I"), PortDirection::In).unwrap();
    nl.connect(tap, interner.get_or_intern("I"), q5).unwrap();

    let normalize_pass = NormalizePass {
        options: NormalizeOptions::from_config(&config, interner),
    };
    let chain_pass = ChainPackPass {
        fabric: ConfiguredFabric::from_config(&config, interner).unwrap(),
    };
    let sink = DiagnosticSink::new();
    assert!(run_passes(&[&normalize_pass, &chain_pass], &mut nl, &sink).unwrap());

    let names: Vec<String> = nl.cells().map(|(_, c)| c.name.clone()).collect();
    let messages = sink.take_all().into_iter().map(|d| d.message).collect();
    (format!("{} {}", nl.fingerprint(), names.join(",")), messages)
}

#[test]
fn pipeline_is_deterministic() {
    let first = full_flow(&Interner::new());
    // A second interner with unrelated names interned first gives different
    // identifier numbering.
    let other = Interner::new();
    for name in ["Z", "Y", "CLK", "Q", "D"] {
        other.get_or_intern(name);
    }
    let second = full_flow(&other);
    assert_eq!(first, second);
}

#[test]
fn rewrite_then_pack() {
    let interner = Interner::new();
    let i = |s: &str| interner.get_or_intern(s);
    let config = config();
    let mut nl = Netlist::new(&interner);
    let mut regs = Vec::new();
    let mut prev_q = None;
    for k in 0..5 {
        let r = nl.create_cell(i("FD1S3AX"), format!("ff{k}"));
        let ports = [
            ("DI", PortDirection::In),
            ("QO", PortDirection::Out),
            ("CK", PortDirection::In),
        ];
        for (port, dir) in ports {
            nl.add_port(r, i(port), dir).unwrap();
        }
        if let Some(net) = prev_q {
            nl.connect(r, i("DI"), net).unwrap();
        }
        if k < 4 {
            let net = nl.create_net(format!("ff{k}_q"));
            nl.connect(r, i("QO"), net).unwrap();
            prev_q = Some(net);
        }
        regs.push(r);
    }

    let sink = DiagnosticSink::new();
    let summary = generic_xform(&mut nl, &RuleSet::from_config(&config, &interner), &sink).unwrap();
    assert_eq!(summary.total(), 5);
    let cell = nl.cell(regs[2]);
    assert_eq!(cell.cell_type, i("DFF"));
    assert_eq!(cell.attrs[&i("X_ORIG_TYPE")], ParamValue::Str("FD1S3AX".into()));
    assert_eq!(cell.params[&i("GSR")], ParamValue::Str("DISABLED".into()));
    assert!(cell.port(i("CK")).is_some());

    let fabric = ConfiguredFabric::from_config(&config, &interner).unwrap();
    let segments = pack_chains(&mut nl, &fabric, &sink).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].members, regs);
    assert_eq!(nl.cell_count(), 5);
}

#[test]
fn packing_twice_changes_nothing() {
    let interner = Interner::new();
    let mut nl = Netlist::new(&interner);
    add_registers(&mut nl, "r", 10);
    let pass = ChainPackPass {
        fabric: fabric(&interner),
    };
    let sink = DiagnosticSink::new();
    assert!(run_passes(&[&pass], &mut nl, &sink).unwrap());
    let before = nl.fingerprint();
    assert!(!run_passes(&[&pass], &mut nl, &sink).unwrap());
    assert_eq!(nl.fingerprint(), before);
}
