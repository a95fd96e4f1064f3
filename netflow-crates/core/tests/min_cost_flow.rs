//! Compares the min-cost-flow propagator against brute-force enumeration on small random
//! networks: the optimum has to match at the root, and a complete search over the variables
//! has to find exactly the solutions the enumeration finds. The network invariants are checked
//! after every propagation and every backtrack.
use std::collections::HashSet;

use netflow_core::propagators::min_cost_flow::FlowBounds;
use netflow_core::propagators::min_cost_flow::MinCostFlowOptions;
use netflow_core::propagators::min_cost_flow::MinCostFlowPropagator;
use netflow_core::propagators::min_cost_flow::NetworkBuilder;
use netflow_core::propagators::min_cost_flow::StructureBehaviour;
use netflow_core::propagators::min_cost_flow::UnitCost;
use netflow_core::DomainId;
use netflow_core::IntervalDomain;
use netflow_core::PropagatorHandle;
use netflow_core::Solver;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

const NUM_INSTANCES: u64 = 60;
const MAX_UNIT_COST: i64 = 3;

#[derive(Clone, Debug)]
struct RandomArc {
    from: usize,
    to: usize,
    upper: i64,
    /// Either a fixed unit cost or, with `None`, a cost variable in `[1, MAX_UNIT_COST]`.
    cost: Option<i64>,
    /// Whether the flow is a variable which is branched on.
    has_flow_variable: bool,
}

#[derive(Clone, Debug)]
struct RandomStructure {
    behaviour: StructureBehaviour,
    num_values: i64,
    /// Arc index with the values which select it.
    arcs: Vec<(usize, Vec<i64>)>,
}

#[derive(Clone, Debug)]
struct Instance {
    supplies: Vec<i64>,
    arcs: Vec<RandomArc>,
    structure: Option<RandomStructure>,
    cost_bound: i64,
}

impl Instance {
    fn generate(rng: &mut SmallRng, with_structure: bool) -> Instance {
        let num_nodes = rng.gen_range(3..=4);
        let num_arcs = rng.gen_range(3..=5);

        let mut supplies = vec![0; num_nodes];
        let mut arcs = Vec::with_capacity(num_arcs);
        for _ in 0..num_arcs {
            let from = rng.gen_range(0..num_nodes);
            let to = (from + rng.gen_range(1..num_nodes)) % num_nodes;
            let upper = rng.gen_range(1..=2);
            let cost = if rng.gen_bool(0.25) {
                None
            } else {
                Some(rng.gen_range(0..=MAX_UNIT_COST))
            };

            // The supplies are derived from a flow within the bounds, so a flow always exists.
            let reference_flow = rng.gen_range(0..=upper);
            supplies[from] += reference_flow;
            supplies[to] -= reference_flow;

            arcs.push(RandomArc {
                from,
                to,
                upper,
                cost,
                has_flow_variable: rng.gen_bool(0.8),
            });
        }

        let structure = with_structure.then(|| {
            let behaviour = match rng.gen_range(0..3) {
                0 => StructureBehaviour::PruneActive,
                1 => StructureBehaviour::PruneInactive,
                _ => StructureBehaviour::PruneBoth,
            };
            let num_values = 3;
            let num_bound = rng.gen_range(2..=num_arcs.min(3));
            let arcs = (0..num_bound)
                .map(|arc| {
                    let mut values = (0..num_values)
                        .filter(|_| rng.gen_bool(0.5))
                        .collect::<Vec<_>>();
                    if values.is_empty() {
                        values.push(rng.gen_range(0..num_values));
                    }
                    (arc, values)
                })
                .collect();
            RandomStructure {
                behaviour,
                num_values,
                arcs,
            }
        });

        let mut instance = Instance {
            supplies,
            arcs,
            structure,
            cost_bound: 0,
        };
        if let Some(optimum) = instance.enumerate(i64::MAX).0 {
            instance.cost_bound = (optimum + rng.gen_range(-1..=3)).max(0);
        }
        instance
    }

    fn num_assignments(&self) -> usize {
        let flows: usize = self.arcs.iter().map(|arc| arc.upper as usize + 1).product();
        let costs = (MAX_UNIT_COST as usize).pow(self.num_cost_variables() as u32);
        let selections = self
            .structure
            .as_ref()
            .map_or(1, |structure| structure.num_values as usize);
        flows * costs * selections
    }

    fn num_cost_variables(&self) -> usize {
        self.arcs.iter().filter(|arc| arc.cost.is_none()).count()
    }

    /// Enumerates every assignment and returns the cheapest cost of a feasible one, along with
    /// the assignments of the branched variables which can be extended to a solution costing at
    /// most `cost_bound`.
    fn enumerate(&self, cost_bound: i64) -> (Option<i64>, HashSet<Vec<i64>>) {
        let mut optimum = None;
        let mut solutions = HashSet::new();

        for mut index in 0..self.num_assignments() {
            let mut digit = |base: i64| {
                let value = (index % base as usize) as i64;
                index /= base as usize;
                value
            };

            let flows = self
                .arcs
                .iter()
                .map(|arc| digit(arc.upper + 1))
                .collect::<Vec<_>>();
            let unit_costs = self
                .arcs
                .iter()
                .map(|arc| arc.cost.unwrap_or_else(|| digit(MAX_UNIT_COST) + 1))
                .collect::<Vec<_>>();
            let selection = self
                .structure
                .as_ref()
                .map(|structure| digit(structure.num_values));

            if !self.is_feasible(&flows, selection) {
                continue;
            }

            let cost: i64 = flows.iter().zip(&unit_costs).map(|(f, c)| f * c).sum();
            optimum = Some(optimum.map_or(cost, |best: i64| best.min(cost)));
            if cost <= cost_bound {
                let _ = solutions.insert(self.branched_values(&flows, &unit_costs, selection));
            }
        }

        (optimum, solutions)
    }

    fn is_feasible(&self, flows: &[i64], selection: Option<i64>) -> bool {
        let mut excess = self.supplies.clone();
        for (arc, &flow) in self.arcs.iter().zip(flows) {
            excess[arc.from] -= flow;
            excess[arc.to] += flow;
        }
        if excess.iter().any(|&value| value != 0) {
            return false;
        }

        let (Some(structure), Some(selection)) = (&self.structure, selection) else {
            return true;
        };
        structure.arcs.iter().all(|(arc, values)| {
            let selected = values.contains(&selection);
            let flow = flows[*arc];
            let upper = self.arcs[*arc].upper;
            match structure.behaviour {
                StructureBehaviour::PruneActive => !selected || flow == upper,
                StructureBehaviour::PruneInactive => selected || flow == 0,
                StructureBehaviour::PruneBoth => flow == if selected { upper } else { 0 },
            }
        })
    }

    /// The values of the variables in the order in which the search branches on them.
    fn branched_values(
        &self,
        flows: &[i64],
        unit_costs: &[i64],
        selection: Option<i64>,
    ) -> Vec<i64> {
        selection
            .into_iter()
            .chain(
                self.arcs
                    .iter()
                    .zip(flows)
                    .filter(|(arc, _)| arc.has_flow_variable)
                    .map(|(_, &flow)| flow),
            )
            .chain(
                self.arcs
                    .iter()
                    .zip(unit_costs)
                    .filter(|(arc, _)| arc.cost.is_none())
                    .map(|(_, &cost)| cost),
            )
            .collect()
    }
}

struct Model {
    solver: Solver,
    cost: DomainId,
    branched: Vec<DomainId>,
}

impl Model {
    fn new(instance: &Instance) -> (Model, NetworkBuilder) {
        let mut solver = Solver::default();
        let mut builder = NetworkBuilder::default();
        let nodes = instance
            .supplies
            .iter()
            .map(|&supply| builder.add_node(supply))
            .collect::<Vec<_>>();

        let selector = instance
            .structure
            .as_ref()
            .map(|structure| solver.new_bounded_integer(0, structure.num_values - 1));

        let mut flow_variables = Vec::new();
        let mut cost_variables = Vec::new();
        let mut arcs = Vec::new();
        for arc in &instance.arcs {
            let bounds = if arc.has_flow_variable {
                let var = solver.new_bounded_integer(0, arc.upper);
                flow_variables.push(var);
                FlowBounds::Variable(var)
            } else {
                FlowBounds::Fixed {
                    lower: 0,
                    upper: arc.upper,
                }
            };
            let cost = match arc.cost {
                Some(cost) => UnitCost::Fixed(cost),
                None => {
                    let var = solver.new_bounded_integer(1, MAX_UNIT_COST);
                    cost_variables.push(var);
                    UnitCost::Variable(var)
                }
            };
            arcs.push(
                builder
                    .add_arc(nodes[arc.from], nodes[arc.to], bounds, cost)
                    .expect("valid arc"),
            );
        }

        if let (Some(structure), Some(selector)) = (&instance.structure, selector) {
            builder
                .add_structure(
                    selector,
                    structure.behaviour,
                    structure.arcs.iter().map(|(arc, values)| {
                        (arcs[*arc], IntervalDomain::from_values(values.iter().copied()))
                    }),
                )
                .expect("valid structure");
        }

        let cost = solver.new_bounded_integer(0, instance.cost_bound);
        let branched = selector
            .into_iter()
            .chain(flow_variables)
            .chain(cost_variables)
            .collect();
        (
            Model {
                solver,
                cost,
                branched,
            },
            builder,
        )
    }

    fn check_network(&self, handle: PropagatorHandle<MinCostFlowPropagator>) {
        let propagator = self
            .solver
            .get_propagator(handle)
            .expect("the propagator exists");
        let network = propagator.network();
        let level = self.solver.decision_level();
        assert!(network.check_invariants(), "invariants broken at level {level}");
        assert!(network.is_balanced(), "unbalanced nodes at level {level}");
        assert!(
            network.check_structure_domains(&self.solver.domains()),
            "a decided structure arc is pending at level {level}"
        );
    }

    /// Branches on the variables in order and collects the assignments at which propagation
    /// succeeds with every variable fixed.
    fn search(
        &mut self,
        handle: PropagatorHandle<MinCostFlowPropagator>,
        solutions: &mut HashSet<Vec<i64>>,
    ) {
        let Some(&var) = self
            .branched
            .iter()
            .find(|&&var| !self.solver.is_fixed(var))
        else {
            let _ = solutions.insert(
                self.branched
                    .iter()
                    .map(|&var| self.solver.lower_bound(var))
                    .collect(),
            );
            return;
        };

        let level = self.solver.decision_level();
        let cost_lower_bound = self.solver.lower_bound(self.cost);
        let values = self.solver.domain(var).values().collect::<Vec<_>>();
        for value in values {
            self.solver.new_decision_level();
            let _ = self
                .solver
                .post_assignment(var, value)
                .expect("the value is in the domain");
            if self.solver.propagate().is_ok() {
                assert!(self.solver.lower_bound(self.cost) >= cost_lower_bound);
                self.check_network(handle);
                self.search(handle, solutions);
            }

            self.solver.backtrack(level);
            self.check_network(handle);
        }
    }
}

fn check_instances(with_structure: bool, options: MinCostFlowOptions) {
    let _ = env_logger::builder().is_test(true).try_init();

    for seed in 0..NUM_INSTANCES {
        let mut rng = SmallRng::seed_from_u64(seed);
        let instance = Instance::generate(&mut rng, with_structure);
        let (optimum, expected) = instance.enumerate(instance.cost_bound);

        let (mut model, builder) = Model::new(&instance);
        let constructor = builder.build(model.cost, options).expect("valid network");
        let result = model.solver.add_propagator(constructor);

        let Ok(handle) = result else {
            assert!(
                expected.is_empty(),
                "seed {seed}: propagation failed on {instance:?} with {} solutions",
                expected.len()
            );
            continue;
        };
        // Structure bindings are relaxed until their arcs are grounded, so the optimum at the
        // root is only a lower bound when there is one.
        let cost_lower_bound = model.solver.lower_bound(model.cost);
        match (optimum, &instance.structure) {
            (Some(optimum), None) => assert_eq!(
                optimum, cost_lower_bound,
                "seed {seed}: wrong optimum for {instance:?}"
            ),
            (Some(optimum), Some(_)) => assert!(
                cost_lower_bound <= optimum,
                "seed {seed}: optimum {optimum} cut off for {instance:?}"
            ),
            (None, _) => assert!(instance.structure.is_some()),
        }
        model.check_network(handle);

        let mut found = HashSet::new();
        model.search(handle, &mut found);
        assert_eq!(expected, found, "seed {seed}: wrong solutions for {instance:?}");
    }
}

#[test]
fn random_networks_match_enumeration() {
    check_instances(false, MinCostFlowOptions::default());
}

#[test]
fn random_networks_match_enumeration_without_degree_pruning() {
    check_instances(
        false,
        MinCostFlowOptions {
            degree_pruning: false,
            ..Default::default()
        },
    );
}

#[test]
fn random_structures_match_enumeration() {
    check_instances(true, MinCostFlowOptions::default());
}

#[test]
fn random_structures_match_enumeration_with_few_analysed_arcs() {
    check_instances(
        true,
        MinCostFlowOptions {
            pruning_fraction: 0.0,
            minimum_pruned_arcs: 1,
            ..Default::default()
        },
    );
}
