//! Rule-driven cell rewriting.
//!
//! A [`RewriteRule`] retargets an abstract cell type to a physical one while
//! renaming its ports and parameters. Rules are keyed by source type in a
//! [`RuleSet`]; [`generic_xform`] applies them to every matching cell.

use crate::pass::PackPass;
use std::collections::BTreeMap;
use tilepack_arch::template::{param_table, param_value};
use tilepack_common::{Ident, Interner};
use tilepack_config::{PackConfig, RuleConfig};
use tilepack_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tilepack_netlist::{
    CellId, NetId, Netlist, PackError, PackResult, ParamValue, PortDirection,
};

const CELLS_CREATED: DiagnosticCode = DiagnosticCode::new(Category::Rewrite, 1);

/// Attribute recording a rewritten cell's type before the rewrite.
pub const ORIG_TYPE_ATTR: &str = "X_ORIG_TYPE";
/// Prefix of the attributes recording a renamed port's previous name.
pub const ORIG_PORT_ATTR_PREFIX: &str = "X_ORIG_PORT_";

/// A declarative transformation from one cell type to another.
#[derive(Clone, Debug)]
pub struct RewriteRule {
    /// The type the cell becomes.
    pub new_type: Ident,
    /// One-to-one port renames.
    pub port_rename: BTreeMap<Ident, Ident>,
    /// Ports whose net is wired to each of several new ports.
    pub port_fanout_rename: BTreeMap<Ident, Vec<Ident>>,
    /// Parameters copied under a new name; the old key is kept.
    pub param_rename: BTreeMap<Ident, Ident>,
    /// Attributes set unconditionally.
    pub fixed_attrs: BTreeMap<Ident, ParamValue>,
    /// Parameters set unconditionally.
    pub fixed_params: BTreeMap<Ident, ParamValue>,
    /// Parameters set only when absent.
    pub default_params: BTreeMap<Ident, ParamValue>,
}

impl RewriteRule {
    /// Creates a rule that only changes the type (and strips port brackets).
    pub fn new(new_type: Ident) -> Self {
        Self {
            new_type,
            port_rename: BTreeMap::new(),
            port_fanout_rename: BTreeMap::new(),
            param_rename: BTreeMap::new(),
            fixed_attrs: BTreeMap::new(),
            fixed_params: BTreeMap::new(),
            default_params: BTreeMap::new(),
        }
    }

    /// Builds a rule from its configuration.
    pub fn from_config(config: &RuleConfig, interner: &Interner) -> Self {
        let intern = |s: &String| interner.get_or_intern(s);
        Self {
            new_type: interner.get_or_intern(&config.new_type),
            port_rename: config
                .port_rename
                .iter()
                .map(|(k, v)| (intern(k), intern(v)))
                .collect(),
            port_fanout_rename: config
                .port_fanout_rename
                .iter()
                .map(|(k, v)| (intern(k), v.iter().map(intern).collect()))
                .collect(),
            param_rename: config
                .param_rename
                .iter()
                .map(|(k, v)| (intern(k), intern(v)))
                .collect(),
            fixed_attrs: config
                .fixed_attrs
                .iter()
                .map(|(k, v)| (intern(k), param_value(v)))
                .collect(),
            fixed_params: param_table(&config.fixed_params, interner),
            default_params: param_table(&config.default_params, interner),
        }
    }

    /// Adds a one-to-one port rename.
    pub fn rename_port(mut self, from: Ident, to: Ident) -> Self {
        self.port_rename.insert(from, to);
        self
    }

    /// Adds a fan-out port rename.
    pub fn fanout_port(mut self, from: Ident, to: Vec<Ident>) -> Self {
        self.port_fanout_rename.insert(from, to);
        self
    }

    /// Adds a parameter rename.
    pub fn rename_param(mut self, from: Ident, to: Ident) -> Self {
        self.param_rename.insert(from, to);
        self
    }
}

/// Rewrite rules keyed by source cell type.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: BTreeMap<Ident, RewriteRule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the rule set from the `[rules.*]` sections.
    pub fn from_config(config: &PackConfig, interner: &Interner) -> Self {
        Self {
            rules: config
                .rules
                .iter()
                .map(|(ty, rule)| {
                    (
                        interner.get_or_intern(ty),
                        RewriteRule::from_config(rule, interner),
                    )
                })
                .collect(),
        }
    }

    /// Adds or replaces the rule for `source_type`.
    pub fn insert(&mut self, source_type: Ident, rule: RewriteRule) {
        self.rules.insert(source_type, rule);
    }

    /// Returns the rule for `source_type`.
    pub fn get(&self, source_type: Ident) -> Option<&RewriteRule> {
        self.rules.get(&source_type)
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Cells created per new type by one [`generic_xform`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XformSummary {
    /// New type name to count and source type counts.
    pub created: BTreeMap<String, XformCount>,
}

/// How many cells became one new type, and from which source types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XformCount {
    /// Total cells of the new type.
    pub total: usize,
    /// Cells per source type.
    pub sources: BTreeMap<String, usize>,
}

impl XformSummary {
    /// Returns the total number of rewritten cells.
    pub fn total(&self) -> usize {
        self.created.values().map(|c| c.total).sum()
    }
}

fn strip_brackets(name: &str) -> String {
    name.chars().filter(|&c| c != '[' && c != ']').collect()
}

fn new_port_names(interner: &Interner, rule: &RewriteRule, old: Ident) -> Vec<Ident> {
    if let Some(names) = rule.port_fanout_rename.get(&old) {
        return names.clone();
    }
    match rule.port_rename.get(&old) {
        Some(&name) => vec![name],
        None => vec![interner.get_or_intern(&strip_brackets(interner.resolve(old)))],
    }
}

/// Applies a rule to one cell.
///
/// Steps run in a fixed order: set the new type; rewrite every port (fan-out
/// renames first, then one-to-one renames, otherwise strip `[`/`]` from the
/// name); copy renamed parameters under their new keys; fill default
/// parameters; overlay fixed attributes and parameters. The previous type is
/// recorded in `X_ORIG_TYPE` and every renamed port in
/// `X_ORIG_PORT_<new name>`.
///
/// Fails with [`PackError::Invariant`], leaving the cell untouched, if two
/// ports would end up with the same name.
pub fn xform_cell(netlist: &mut Netlist<'_>, rule: &RewriteRule, cell: CellId) -> PackResult<()> {
    let interner = netlist.interner;
    let ports: Vec<(Ident, PortDirection, Option<NetId>, Vec<Ident>)> = netlist
        .cell(cell)
        .ports
        .iter()
        .map(|p| (p.name, p.direction, p.net, new_port_names(interner, rule, p.name)))
        .collect();
    let mut taken = BTreeMap::new();
    for (old, _, _, new_names) in &ports {
        for &new in new_names {
            if let Some(first) = taken.insert(new, *old) {
                return Err(PackError::Invariant(format!(
                    "rewriting '{}' maps ports '{}' and '{}' onto '{}'",
                    netlist.cell(cell).name,
                    interner.resolve(first),
                    interner.resolve(*old),
                    interner.resolve(new)
                )));
            }
        }
    }

    let orig_type = netlist.cell(cell).cell_type;
    {
        let c = netlist.cell_mut(cell);
        c.cell_type = rule.new_type;
        c.attrs.insert(
            interner.get_or_intern(ORIG_TYPE_ATTR),
            ParamValue::Str(interner.resolve(orig_type).to_string()),
        );
    }

    // Detach every port first so that renames cannot collide with names
    // that are themselves about to be renamed.
    for &(name, ..) in &ports {
        netlist.disconnect(cell, name)?;
        netlist.remove_port(cell, name)?;
    }
    for (old, direction, net, new_names) in ports {
        for new in new_names {
            netlist.add_port(cell, new, direction)?;
            if let Some(net) = net {
                netlist.connect(cell, new, net)?;
            }
            if new != old {
                let key = format!("{ORIG_PORT_ATTR_PREFIX}{}", interner.resolve(new));
                netlist.cell_mut(cell).attrs.insert(
                    interner.get_or_intern(&key),
                    ParamValue::Str(interner.resolve(old).to_string()),
                );
            }
        }
    }

    let c = netlist.cell_mut(cell);
    for (&old, &new) in &rule.param_rename {
        if let Some(value) = c.params.get(&old).cloned() {
            c.params.insert(new, value);
        }
    }
    for (&key, value) in &rule.default_params {
        c.params.entry(key).or_insert_with(|| value.clone());
    }
    for (&key, value) in &rule.fixed_attrs {
        c.attrs.insert(key, value.clone());
    }
    for (&key, value) in &rule.fixed_params {
        c.params.insert(key, value.clone());
    }
    Ok(())
}

/// Applies the matching rule to every cell whose type has one.
///
/// Cells without a rule are left untouched. Emits one note per new type.
pub fn generic_xform(
    netlist: &mut Netlist<'_>,
    rules: &RuleSet,
    sink: &DiagnosticSink,
) -> PackResult<XformSummary> {
    let interner = netlist.interner;
    let mut summary = XformSummary::default();
    for cell in netlist.cell_ids() {
        let source = netlist.cell(cell).cell_type;
        let Some(rule) = rules.get(source) else {
            continue;
        };
        xform_cell(netlist, rule, cell)?;
        let count = summary
            .created
            .entry(interner.resolve(rule.new_type).to_string())
            .or_default();
        count.total += 1;
        *count
            .sources
            .entry(interner.resolve(source).to_string())
            .or_default() += 1;
    }
    for (new_type, count) in &summary.created {
        let sources: Vec<String> = count
            .sources
            .iter()
            .map(|(ty, n)| format!("{n}x {ty}"))
            .collect();
        sink.emit(Diagnostic::note(
            CELLS_CREATED,
            format!(
                "Created {} {new_type} cells from: {}",
                count.total,
                sources.join(", ")
            ),
        ));
    }
    Ok(summary)
}

/// [`generic_xform`] as a [`PackPass`].
pub struct RewritePass {
    /// The rules to apply.
    pub rules: RuleSet,
}

impl PackPass for RewritePass {
    fn name(&self) -> &str {
        "rewrite"
    }

    fn run(&self, netlist: &mut Netlist<'_>, sink: &DiagnosticSink) -> PackResult<bool> {
        Ok(generic_xform(netlist, &self.rules, sink)?.total() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilepack_config::load_config_from_str;
    use tilepack_netlist::PortRef;

    struct Lut<'a> {
        nl: Netlist<'a>,
        cell: CellId,
        a: NetId,
        clk: NetId,
        z: NetId,
    }

    /// A LUT4 with `A` and `CLK[0]` connected, `B` open, and output `Z`.
    fn lut(interner: &Interner) -> Lut<'_> {
        let mut nl = Netlist::new(interner);
        let i = |s: &str| interner.get_or_intern(s);
        let cell = nl.create_cell(i("LUT4"), "l0");
        nl.add_port(cell, i("A"), PortDirection::In).unwrap();
        nl.add_port(cell, i("B"), PortDirection::In).unwrap();
        nl.add_port(cell, i("CLK[0]"), PortDirection::In).unwrap();
        nl.add_port(cell, i("Z"), PortDirection::Out).unwrap();
        nl.cell_mut(cell).params.insert(i("INIT"), ParamValue::Int(0xAAAA));
        let a = nl.create_net("a");
        let clk = nl.create_net("clk");
        let z = nl.create_net("z");
        nl.connect(cell, i("A"), a).unwrap();
        nl.connect(cell, i("CLK[0]"), clk).unwrap();
        nl.connect(cell, i("Z"), z).unwrap();
        Lut { nl, cell, a, clk, z }
    }

    #[test]
    fn renames_type_ports_and_params() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let mut f = lut(&interner);
        let rule = RewriteRule::new(i("SLICE"))
            .rename_port(i("A"), i("A0"))
            .rename_port(i("Z"), i("F0"))
            .rename_param(i("INIT"), i("LUT0_INITVAL"));
        xform_cell(&mut f.nl, &rule, f.cell).unwrap();

        let c = f.nl.cell(f.cell);
        assert_eq!(c.cell_type, i("SLICE"));
        assert_eq!(c.port_net(i("A0")), Some(f.a));
        assert_eq!(c.port_net(i("F0")), Some(f.z));
        assert!(c.port(i("A")).is_none());
        assert_eq!(c.params.get(&i("LUT0_INITVAL")), Some(&ParamValue::Int(0xAAAA)));
        // Renaming copies; the source key stays.
        assert_eq!(c.params.get(&i("INIT")), Some(&ParamValue::Int(0xAAAA)));
        assert_eq!(c.attrs[&i(ORIG_TYPE_ATTR)], ParamValue::Str("LUT4".into()));
        assert_eq!(c.attrs[&i("X_ORIG_PORT_F0")], ParamValue::Str("Z".into()));
        assert_eq!(
            f.nl.net(f.z).driver,
            Some(PortRef {
                cell: f.cell,
                port: i("F0")
            })
        );
    }

    #[test]
    fn strips_brackets_from_unmapped_ports() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let mut f = lut(&interner);
        xform_cell(&mut f.nl, &RewriteRule::new(i("SLICE")), f.cell).unwrap();
        let c = f.nl.cell(f.cell);
        assert_eq!(c.port_net(i("CLK0")), Some(f.clk));
        assert_eq!(c.attrs[&i("X_ORIG_PORT_CLK0")], ParamValue::Str("CLK[0]".into()));
        // Unchanged names are not recorded.
        assert!(!c.attrs.contains_key(&i("X_ORIG_PORT_A")));
        // Unconnected ports survive the rewrite.
        assert!(c.port(i("B")).is_some());
    }

    #[test]
    fn fanout_wires_net_to_every_new_port() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let mut f = lut(&interner);
        let rule =
            RewriteRule::new(i("SLICE")).fanout_port(i("CLK[0]"), vec![i("CLK"), i("LSRCLK")]);
        xform_cell(&mut f.nl, &rule, f.cell).unwrap();
        let c = f.nl.cell(f.cell);
        assert_eq!(c.port_net(i("CLK")), Some(f.clk));
        assert_eq!(c.port_net(i("LSRCLK")), Some(f.clk));
        assert_eq!(f.nl.net(f.clk).sinks.len(), 2);
    }

    #[test]
    fn rename_onto_a_renamed_name_does_not_collide() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let mut f = lut(&interner);
        let rule = RewriteRule::new(i("SLICE"))
            .rename_port(i("A"), i("B"))
            .rename_port(i("B"), i("C"));
        xform_cell(&mut f.nl, &rule, f.cell).unwrap();
        let c = f.nl.cell(f.cell);
        assert_eq!(c.port_net(i("B")), Some(f.a));
        assert!(c.port(i("C")).is_some());
    }

    #[test]
    fn two_ports_onto_one_name_are_rejected() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let mut f = lut(&interner);
        let rule = RewriteRule::new(i("SLICE"))
            .rename_port(i("A"), i("X"))
            .rename_port(i("CLK[0]"), i("X"));
        let err = xform_cell(&mut f.nl, &rule, f.cell).unwrap_err();
        assert!(matches!(err, PackError::Invariant(msg) if msg.contains("'X'")));
    }

    #[test]
    fn unconnected_port_cannot_merge_into_a_renamed_one() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let mut f = lut(&interner);
        let before = f.nl.fingerprint();
        // B has no net, so connect alone would not notice the clash.
        let rule = RewriteRule::new(i("SLICE"))
            .rename_port(i("A"), i("A0"))
            .fanout_port(i("B"), vec![i("B0"), i("A0")]);
        let err = xform_cell(&mut f.nl, &rule, f.cell).unwrap_err();
        assert!(matches!(err, PackError::Invariant(_)));
        assert_eq!(f.nl.fingerprint(), before);
        assert_eq!(f.nl.cell(f.cell).cell_type, i("LUT4"));
    }

    #[test]
    fn params_order_defaults_then_fixed() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let mut f = lut(&interner);
        let mut rule = RewriteRule::new(i("SLICE"));
        rule.default_params.insert(i("INIT"), ParamValue::Int(0));
        rule.default_params.insert(i("MODE"), ParamValue::Str("LOGIC".into()));
        rule.fixed_params.insert(i("MODE"), ParamValue::Str("RAMW".into()));
        rule.fixed_attrs.insert(i("PACKED"), ParamValue::Int(1));
        xform_cell(&mut f.nl, &rule, f.cell).unwrap();
        let c = f.nl.cell(f.cell);
        assert_eq!(c.params[&i("INIT")], ParamValue::Int(0xAAAA));
        assert_eq!(c.params[&i("MODE")], ParamValue::Str("RAMW".into()));
        assert_eq!(c.attrs[&i("PACKED")], ParamValue::Int(1));
    }

    #[test]
    fn generic_xform_touches_only_ruled_types() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let config = load_config_from_str(
            r#"
[rules.LUT4]
new_type = "SLICE"
port_rename = { Z = "F" }
"#,
        )
        .unwrap();
        let rules = RuleSet::from_config(&config, &interner);
        assert_eq!(rules.len(), 1);

        let mut f = lut(&interner);
        let ff = f.nl.create_cell(i("DFF"), "r0");
        let second = f.nl.create_cell(i("LUT4"), "l1");
        let sink = DiagnosticSink::new();
        let summary = generic_xform(&mut f.nl, &rules, &sink).unwrap();

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.created["SLICE"].sources["LUT4"], 2);
        assert_eq!(f.nl.cell(ff).cell_type, i("DFF"));
        assert!(f.nl.cell(ff).attrs.is_empty());
        assert_eq!(f.nl.cell(second).cell_type, i("SLICE"));
        let notes = sink.take_all();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Created 2 SLICE cells from: 2x LUT4");
    }

    #[test]
    fn empty_rule_set_changes_nothing() {
        let interner = Interner::new();
        let mut f = lut(&interner);
        let before = f.nl.fingerprint();
        let pass = RewritePass {
            rules: RuleSet::new(),
        };
        let sink = DiagnosticSink::new();
        assert!(!pass.run(&mut f.nl, &sink).unwrap());
        assert_eq!(f.nl.fingerprint(), before);
        assert!(pass.rules.is_empty());
    }
}
