//! Cluster construction and validation.
//!
//! A cluster is a rigid group of cells placed as one unit: a root with zero
//! offsets and children at offsets from it. A child's `dz` is either relative
//! to the root's slot or, with `abs_z`, an absolute sub-tile slot. Every
//! builder here validates statically that no cell joins two clusters and
//! that no two members of one cluster resolve to the same slot.

use std::collections::{BTreeMap, BTreeSet};
use tilepack_common::Ident;
use tilepack_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tilepack_netlist::{Cell, CellId, ClusterDescriptor, Netlist, PackError, PackResult};

const PAIRS_CLUSTERED: DiagnosticCode = DiagnosticCode::new(Category::Cluster, 1);

/// Placement of a cluster member relative to the root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ClusterOffset {
    /// Horizontal tile offset.
    pub dx: i32,
    /// Vertical tile offset.
    pub dy: i32,
    /// Slot offset, or absolute slot with `abs_z`.
    pub dz: i32,
    /// Whether `dz` is an absolute slot.
    pub abs_z: bool,
}

impl ClusterOffset {
    /// An offset relative to the root's tile and slot.
    pub fn relative(dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            dx,
            dy,
            dz,
            abs_z: false,
        }
    }

    /// An offset relative to the root's tile at an absolute slot.
    pub fn absolute(dx: i32, dy: i32, z: i32) -> Self {
        Self {
            dx,
            dy,
            dz: z,
            abs_z: true,
        }
    }
}

impl From<&ClusterDescriptor> for ClusterOffset {
    fn from(desc: &ClusterDescriptor) -> Self {
        Self {
            dx: desc.dx,
            dy: desc.dy,
            dz: desc.dz,
            abs_z: desc.abs_z,
        }
    }
}

/// A cluster flattened for the placer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterView {
    /// The root cell.
    pub root: CellId,
    /// The root's own placement: all zero, with `abs_z` pinning it to slot 0.
    pub root_offset: ClusterOffset,
    /// Non-root members in insertion order.
    pub members: Vec<(CellId, ClusterOffset)>,
}

fn cluster_conflict(
    netlist: &Netlist<'_>,
    cell: CellId,
    existing: CellId,
    requested: CellId,
) -> PackError {
    PackError::ClusterConflict {
        cell: netlist.cell(cell).name.clone(),
        existing_root: netlist.cell(existing).name.clone(),
        requested_root: netlist.cell(requested).name.clone(),
    }
}

/// A root sits at `(0, 0, 0)`; `abs_z` only decides whether that slot is
/// absolute.
fn check_root_offset(
    netlist: &Netlist<'_>,
    root: CellId,
    offset: ClusterOffset,
) -> PackResult<()> {
    if (offset.dx, offset.dy, offset.dz) != (0, 0, 0) {
        return Err(PackError::Invariant(format!(
            "cluster root '{}' must have zero offsets",
            netlist.cell(root).name
        )));
    }
    Ok(())
}

/// Checks that no two cells resolve to the same slot.
///
/// With a relative root, relative members share a slot space with the root
/// at `(0, 0, 0)` and absolute members share another. With a root pinned to
/// absolute slot 0, relative and absolute slots coincide.
fn check_slots(
    netlist: &Netlist<'_>,
    root: CellId,
    root_offset: ClusterOffset,
    members: &[(CellId, ClusterOffset)],
) -> PackResult<()> {
    let resolve = |offset: ClusterOffset| -> (bool, i32, i32, i32) {
        let space = root_offset.abs_z || offset.abs_z;
        (space, offset.dx, offset.dy, offset.dz)
    };
    let mut taken: BTreeMap<(bool, i32, i32, i32), CellId> = BTreeMap::new();
    taken.insert(resolve(root_offset), root);
    for &(cell, offset) in members {
        let key = resolve(offset);
        if let Some(&first) = taken.get(&key) {
            let (_, dx, dy, z) = key;
            return Err(PackError::SlotCollision {
                root: netlist.cell(root).name.clone(),
                first: netlist.cell(first).name.clone(),
                second: netlist.cell(cell).name.clone(),
                slot: format!("({dx}, {dy}, {z})"),
            });
        }
        taken.insert(key, cell);
    }
    Ok(())
}

/// Makes `root` the root of a new cluster containing `members`.
///
/// Fails with [`PackError::ClusterConflict`] if the root or a member already
/// belongs to a cluster or is listed twice, with [`PackError::SlotCollision`]
/// if two cells resolve to the same slot, and with [`PackError::Invariant`]
/// if the root offset is not zero. Nothing is modified on failure.
pub fn build_cluster(
    netlist: &mut Netlist<'_>,
    root: CellId,
    root_offset: ClusterOffset,
    members: &[(CellId, ClusterOffset)],
) -> PackResult<()> {
    check_root_offset(netlist, root, root_offset)?;
    if let Some(existing) = netlist.cell(root).cluster.root {
        return Err(cluster_conflict(netlist, root, existing, root));
    }
    let mut seen = BTreeSet::from([root]);
    for &(cell, _) in members {
        if let Some(existing) = netlist.cell(cell).cluster.root {
            return Err(cluster_conflict(netlist, cell, existing, root));
        }
        if !seen.insert(cell) {
            return Err(cluster_conflict(netlist, cell, root, root));
        }
    }
    check_slots(netlist, root, root_offset, members)?;

    netlist.cell_mut(root).cluster = ClusterDescriptor {
        root: Some(root),
        dx: 0,
        dy: 0,
        dz: 0,
        abs_z: root_offset.abs_z,
        children: members.iter().map(|&(c, _)| c).collect(),
    };
    for &(cell, offset) in members {
        netlist.cell_mut(cell).cluster = ClusterDescriptor {
            root: Some(root),
            dx: offset.dx,
            dy: offset.dy,
            dz: offset.dz,
            abs_z: offset.abs_z,
            children: Vec::new(),
        };
    }
    Ok(())
}

fn coord(value: usize) -> PackResult<i32> {
    i32::try_from(value)
        .map_err(|_| PackError::Invariant(format!("cluster offset {value} is out of range")))
}

/// Clusters the physical members of a chain segment.
///
/// The first member is the root at absolute slot 0; member `i` sits at
/// `dy = i / slots_per_tile` and absolute slot `i % slots_per_tile`.
pub fn constrain_chain_segment(
    netlist: &mut Netlist<'_>,
    members: &[CellId],
    slots_per_tile: usize,
) -> PackResult<()> {
    if slots_per_tile == 0 {
        return Err(PackError::Invariant("slots per tile must be at least 1".to_string()));
    }
    let Some((&root, rest)) = members.split_first() else {
        return Ok(());
    };
    let placed = rest
        .iter()
        .enumerate()
        .map(|(k, &cell)| {
            let i = k + 1;
            let (dy, z) = (coord(i / slots_per_tile)?, coord(i % slots_per_tile)?);
            Ok((cell, ClusterOffset::absolute(0, dy, z)))
        })
        .collect::<PackResult<Vec<_>>>()?;
    build_cluster(netlist, root, ClusterOffset::absolute(0, 0, 0), &placed)
}

/// Clusters every driver with the single sink of its `driver_port` net.
///
/// A pair qualifies when the driver matches `driver_pred`, its net has
/// exactly one sink, that sink is `sink_port` of a cell matching `sink_pred`,
/// and neither cell is clustered yet. The sink is placed at `offset`.
/// Returns the number of clusters built.
pub fn constrain_pairs(
    netlist: &mut Netlist<'_>,
    driver_pred: impl Fn(&Cell) -> bool,
    driver_port: Ident,
    sink_pred: impl Fn(&Cell) -> bool,
    sink_port: Ident,
    offset: ClusterOffset,
    sink: &DiagnosticSink,
) -> PackResult<usize> {
    let unclustered = |c: &Cell| c.cluster.root.is_none();
    let mut built = 0;
    for driver in netlist.cell_ids() {
        let cell = netlist.cell(driver);
        if !unclustered(cell) || !driver_pred(cell) {
            continue;
        }
        let Some(net) = netlist.net_of(driver, driver_port) else {
            continue;
        };
        let Some(load) = netlist.net_only_drives(
            net,
            |c| unclustered(c) && sink_pred(c),
            sink_port,
            true,
        ) else {
            continue;
        };
        if load == driver {
            continue;
        }
        build_cluster(netlist, driver, ClusterOffset::default(), &[(load, offset)])?;
        built += 1;
    }
    if built > 0 {
        sink.emit(Diagnostic::note(
            PAIRS_CLUSTERED,
            format!("Clustered {built} driver/sink pair(s)"),
        ));
    }
    Ok(built)
}

/// Verifies the structure of the cluster rooted at `root` on the live netlist.
///
/// The root must point to itself with zero offsets, every child must
/// point back to the root exactly once, no other cell may point to the root,
/// and no two members may resolve to the same slot.
pub fn check_cluster(netlist: &Netlist<'_>, root: CellId) -> PackResult<()> {
    let cell = netlist
        .try_cell(root)
        .ok_or_else(|| PackError::Invariant(format!("cluster root {root} does not exist")))?;
    if cell.cluster.root != Some(root) {
        return Err(PackError::Invariant(format!(
            "cell '{}' is not a cluster root",
            cell.name
        )));
    }
    let root_offset = ClusterOffset::from(&cell.cluster);
    check_root_offset(netlist, root, root_offset)?;

    let mut members = Vec::with_capacity(cell.cluster.children.len());
    let mut seen = BTreeSet::from([root]);
    for &child in &cell.cluster.children {
        let c = netlist.try_cell(child).ok_or_else(|| {
            PackError::Invariant(format!("cluster '{}' lists missing cell {child}", cell.name))
        })?;
        if !seen.insert(child) {
            return Err(PackError::Invariant(format!(
                "cluster '{}' lists '{}' twice",
                cell.name, c.name
            )));
        }
        if c.cluster.root != Some(root) {
            return Err(PackError::Invariant(format!(
                "cell '{}' is listed in cluster '{}' but does not point to it",
                c.name, cell.name
            )));
        }
        members.push((child, ClusterOffset::from(&c.cluster)));
    }
    if let Some((_, orphan)) = netlist
        .cells()
        .find(|(id, c)| c.cluster.root == Some(root) && !seen.contains(id))
    {
        return Err(PackError::Invariant(format!(
            "cell '{}' points to cluster '{}' but is not one of its children",
            orphan.name, cell.name
        )));
    }
    check_slots(netlist, root, root_offset, &members)
}

/// Returns every cluster in netlist order of its root.
pub fn cluster_views(netlist: &Netlist<'_>) -> Vec<ClusterView> {
    netlist
        .cells()
        .filter(|(id, c)| c.cluster.root == Some(*id))
        .map(|(id, c)| ClusterView {
            root: id,
            root_offset: ClusterOffset::from(&c.cluster),
            members: c
                .cluster
                .children
                .iter()
                .filter_map(|&child| {
                    netlist
                        .try_cell(child)
                        .map(|m| (child, ClusterOffset::from(&m.cluster)))
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilepack_common::Interner;
    use tilepack_netlist::PortDirection;

    fn cells<'a>(interner: &'a Interner, n: usize) -> (Netlist<'a>, Vec<CellId>) {
        let mut nl = Netlist::new(interner);
        let ty = interner.get_or_intern("SLICE");
        let ids = (0..n).map(|k| nl.create_cell(ty, format!("s{k}"))).collect();
        (nl, ids)
    }

    #[test]
    fn build_sets_descriptors() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 3);
        build_cluster(
            &mut nl,
            c[0],
            ClusterOffset::default(),
            &[
                (c[1], ClusterOffset::relative(0, 0, 1)),
                (c[2], ClusterOffset::relative(1, 0, 0)),
            ],
        )
        .unwrap();
        assert_eq!(nl.cell(c[0]).cluster.root, Some(c[0]));
        assert_eq!(nl.cell(c[0]).cluster.children, vec![c[1], c[2]]);
        assert_eq!(nl.cell(c[1]).cluster.root, Some(c[0]));
        assert_eq!(nl.cell(c[2]).cluster.dx, 1);
        check_cluster(&nl, c[0]).unwrap();

        let views = cluster_views(&nl);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].root, c[0]);
        assert_eq!(views[0].members[0], (c[1], ClusterOffset::relative(0, 0, 1)));
    }

    #[test]
    fn cell_in_two_clusters_conflicts() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 3);
        let next_slot = [(c[1], ClusterOffset::relative(0, 0, 1))];
        build_cluster(&mut nl, c[0], ClusterOffset::default(), &next_slot).unwrap();
        let err = build_cluster(&mut nl, c[2], ClusterOffset::default(), &next_slot).unwrap_err();
        assert_eq!(
            err,
            PackError::ClusterConflict {
                cell: "s1".into(),
                existing_root: "s0".into(),
                requested_root: "s2".into(),
            }
        );
        // The failed build left the third cell alone.
        assert_eq!(nl.cell(c[2]).cluster, ClusterDescriptor::default());

        let err = build_cluster(&mut nl, c[1], ClusterOffset::default(), &[]).unwrap_err();
        assert!(matches!(err, PackError::ClusterConflict { .. }));
    }

    #[test]
    fn duplicate_member_conflicts() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 2);
        let err = build_cluster(
            &mut nl,
            c[0],
            ClusterOffset::default(),
            &[
                (c[1], ClusterOffset::relative(0, 0, 1)),
                (c[1], ClusterOffset::relative(0, 0, 2)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PackError::ClusterConflict { .. }));
    }

    #[test]
    fn same_relative_slot_collides() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 3);
        let err = build_cluster(
            &mut nl,
            c[0],
            ClusterOffset::default(),
            &[
                (c[1], ClusterOffset::relative(0, 1, 2)),
                (c[2], ClusterOffset::relative(0, 1, 2)),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PackError::SlotCollision {
                root: "s0".into(),
                first: "s1".into(),
                second: "s2".into(),
                slot: "(0, 1, 2)".into(),
            }
        );
    }

    #[test]
    fn member_at_zero_offset_collides_with_root() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 2);
        let on_root = [(c[1], ClusterOffset::default())];
        let err = build_cluster(&mut nl, c[0], ClusterOffset::default(), &on_root).unwrap_err();
        assert!(matches!(err, PackError::SlotCollision { .. }));
    }

    #[test]
    fn absolute_and_relative_slots_are_separate_with_relative_root() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 2);
        let slot0 = [(c[1], ClusterOffset::absolute(0, 0, 0))];
        build_cluster(&mut nl, c[0], ClusterOffset::default(), &slot0).unwrap();
        check_cluster(&nl, c[0]).unwrap();
    }

    #[test]
    fn absolute_root_resolves_relative_members() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 3);
        let err = build_cluster(
            &mut nl,
            c[0],
            ClusterOffset::absolute(0, 0, 0),
            &[
                (c[1], ClusterOffset::relative(0, 0, 3)),
                (c[2], ClusterOffset::absolute(0, 0, 3)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PackError::SlotCollision { slot, .. } if slot == "(0, 0, 3)"));
    }

    #[test]
    fn root_offset_must_be_zero() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 1);
        for offset in [
            ClusterOffset::relative(1, 0, 0),
            ClusterOffset::relative(0, 0, 1),
            ClusterOffset::absolute(0, 0, 2),
        ] {
            let err = build_cluster(&mut nl, c[0], offset, &[]).unwrap_err();
            assert!(matches!(err, PackError::Invariant(_)), "{offset:?}");
        }
        assert_eq!(nl.cell(c[0]).cluster, ClusterDescriptor::default());
    }

    #[test]
    fn check_rejects_root_moved_off_slot_zero() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 2);
        constrain_chain_segment(&mut nl, &c, 4).unwrap();
        nl.cell_mut(c[0]).cluster.dz = 2;
        assert!(matches!(check_cluster(&nl, c[0]), Err(PackError::Invariant(_))));
    }

    #[test]
    fn chain_segment_wraps_slots() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 10);
        constrain_chain_segment(&mut nl, &c, 8).unwrap();
        assert!(nl.cell(c[0]).cluster.abs_z);
        let at = |k: usize| ClusterOffset::from(&nl.cell(c[k]).cluster);
        assert_eq!(at(7), ClusterOffset::absolute(0, 0, 7));
        assert_eq!(at(8), ClusterOffset::absolute(0, 1, 0));
        assert_eq!(at(9), ClusterOffset::absolute(0, 1, 1));
        check_cluster(&nl, c[0]).unwrap();
        assert!(constrain_chain_segment(&mut nl, &c, 0).is_err());
    }

    #[test]
    fn pairs_cluster_exclusive_connections() {
        let interner = Interner::new();
        let i = |s: &str| interner.get_or_intern(s);
        let mut nl = Netlist::new(&interner);
        let pair = |nl: &mut Netlist<'_>, k: usize, extra_sink: bool| {
            let lut = nl.create_cell(i("LUT4"), format!("l{k}"));
            let ff = nl.create_cell(i("DFF"), format!("r{k}"));
            nl.add_port(lut, i("Z"), PortDirection::Out).unwrap();
            nl.add_port(ff, i("D"), PortDirection::In).unwrap();
            let net = nl.create_net(format!("n{k}"));
            nl.connect(lut, i("Z"), net).unwrap();
            nl.connect(ff, i("D"), net).unwrap();
            if extra_sink {
                let other = nl.create_cell(i("DFF"), format!("x{k}"));
                nl.add_port(other, i("D"), PortDirection::In).unwrap();
                nl.connect(other, i("D"), net).unwrap();
            }
            (lut, ff)
        };
        let (l0, r0) = pair(&mut nl, 0, false);
        let (l1, _) = pair(&mut nl, 1, true);

        let lut_ty = i("LUT4");
        let ff_ty = i("DFF");
        let sink = DiagnosticSink::new();
        let built = constrain_pairs(
            &mut nl,
            |c| c.cell_type == lut_ty,
            i("Z"),
            |c| c.cell_type == ff_ty,
            i("D"),
            ClusterOffset::relative(0, 0, 1),
            &sink,
        )
        .unwrap();
        assert_eq!(built, 1);
        assert_eq!(nl.cell(r0).cluster.root, Some(l0));
        assert_eq!(nl.cell(l1).cluster.root, None);
        assert_eq!(sink.take_all()[0].message, "Clustered 1 driver/sink pair(s)");
    }

    #[test]
    fn check_detects_orphans_and_missing_back_pointers() {
        let interner = Interner::new();
        let (mut nl, c) = cells(&interner, 3);
        let next_slot = [(c[1], ClusterOffset::relative(0, 0, 1))];
        build_cluster(&mut nl, c[0], ClusterOffset::default(), &next_slot).unwrap();

        nl.cell_mut(c[2]).cluster.root = Some(c[0]);
        assert!(matches!(check_cluster(&nl, c[0]), Err(PackError::Invariant(_))));
        nl.cell_mut(c[2]).cluster.root = None;

        nl.cell_mut(c[1]).cluster.root = None;
        assert!(matches!(check_cluster(&nl, c[0]), Err(PackError::Invariant(_))));

        assert!(check_cluster(&nl, c[2]).is_err());
    }
}
