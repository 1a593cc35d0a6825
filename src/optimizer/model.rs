//! Network model builder
//!
//! Expands a [`Network`] into the global linear program over the horizon:
//!
//! - one output variable per generator and snapshot
//! - per storage unit: charge, discharge and stored energy at every snapshot
//!   boundary (`N + 1` points, the first one being the initial energy)
//! - one power balance equality per snapshot
//! - one capacity variable per extendable component
//!
//! Fixed and extendable capacities share one bound template: the bound is
//! `pu * capacity` where `capacity` is either a constant or a variable.

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use tracing::debug;

use crate::domain::{Capacity, GeneratorSpec, Network, StorageSpec};
use crate::error::{DispatchError, Result};

/// Capacity as it appears in constraints
#[derive(Debug, Clone, Copy)]
pub enum CapacityTerm {
    Fixed(f64),
    Variable(Variable),
}

impl CapacityTerm {
    pub fn expr(&self) -> Expression {
        match self {
            CapacityTerm::Fixed(v) => Expression::from(*v),
            CapacityTerm::Variable(var) => Expression::from(*var),
        }
    }
}

/// Decision variables of one generator
#[derive(Debug, Clone)]
pub struct GeneratorVars {
    pub p: Vec<Variable>,
    pub p_nom: CapacityTerm,
}

/// Decision variables of one storage unit
#[derive(Debug, Clone)]
pub struct StorageVars {
    /// Stored energy at snapshot boundaries, `e[0]` is the initial energy
    pub e: Vec<Expression>,
    pub store: Vec<Variable>,
    pub dispatch: Vec<Variable>,
    pub e_nom: CapacityTerm,
}

/// Slack on the power balance, only present in the relaxed model
#[derive(Debug, Clone)]
pub struct BalanceSlack {
    pub shortfall: Vec<Variable>,
    pub surplus: Vec<Variable>,
}

/// Build options
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOptions {
    /// Penalty per unit of unbalanced energy. When set, the power balance gets
    /// non-negative slack so the model is feasible whenever the storage
    /// dynamics are.
    pub relax_balance: Option<f64>,
}

/// Fully expanded dispatch LP, ready to hand to a solver
pub struct DispatchModel {
    pub vars: ProblemVariables,
    pub objective: Expression,
    /// Power balance per snapshot, in snapshot order
    pub balance: Vec<Constraint>,
    pub constraints: Vec<Constraint>,
    pub generators: Vec<GeneratorVars>,
    pub storages: Vec<StorageVars>,
    pub slack: Option<BalanceSlack>,
    pub variable_count: usize,
}

impl DispatchModel {
    /// Validate the network and expand it into an LP
    pub fn build(network: &Network, options: ModelOptions) -> Result<Self> {
        network.validate()?;

        let unbounded = network.unbounded_capacities();
        if !unbounded.is_empty() {
            return Err(DispatchError::UnboundedProblem(format!(
                "negative capital cost without an upper bound on {}",
                unbounded.join(", ")
            )));
        }

        let mut builder = Builder {
            vars: ProblemVariables::new(),
            objective: Expression::from(0.0),
            constraints: Vec::new(),
            variable_count: 0,
            dt: network.horizon.step_hours(),
            n: network.snapshots(),
        };

        let generators: Vec<GeneratorVars> = network
            .generators
            .iter()
            .map(|g| builder.add_generator(g))
            .collect();
        let storages: Vec<StorageVars> = network
            .storages
            .iter()
            .map(|s| builder.add_storage(s))
            .collect();
        let slack = options.relax_balance.map(|penalty| builder.add_slack(penalty));

        let balance = (0..builder.n)
            .map(|t| {
                let mut supply = Expression::from(0.0);
                for g in &generators {
                    supply += g.p[t];
                }
                for s in &storages {
                    supply += s.dispatch[t];
                    supply -= s.store[t];
                }
                if let Some(slack) = &slack {
                    supply += slack.shortfall[t];
                    supply -= slack.surplus[t];
                }
                let load = network.load[t];
                constraint!(supply == load)
            })
            .collect::<Vec<_>>();

        debug!(
            snapshots = builder.n,
            variables = builder.variable_count,
            constraints = builder.constraints.len() + balance.len(),
            relaxed = slack.is_some(),
            "dispatch model built"
        );

        Ok(Self {
            vars: builder.vars,
            objective: builder.objective,
            balance,
            constraints: builder.constraints,
            generators,
            storages,
            slack,
            variable_count: builder.variable_count,
        })
    }

    pub fn constraint_count(&self) -> usize {
        self.balance.len() + self.constraints.len()
    }
}

struct Builder {
    vars: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    variable_count: usize,
    dt: f64,
    n: usize,
}

impl Builder {
    fn add(&mut self, definition: good_lp::VariableDefinition) -> Variable {
        self.variable_count += 1;
        self.vars.add(definition)
    }

    fn capacity(&mut self, capacity: &Capacity) -> CapacityTerm {
        match capacity {
            Capacity::Fixed(v) => CapacityTerm::Fixed(*v),
            Capacity::Extendable { min, max, capital_cost } => {
                let mut definition = variable().min(*min);
                if let Some(max) = max {
                    definition = definition.max(*max);
                }
                let var = self.add(definition);
                self.objective += *capital_cost * var;
                CapacityTerm::Variable(var)
            }
        }
    }

    /// Variable bounded by `[lo_pu, hi_pu] * capacity`
    fn bounded(&mut self, lo_pu: f64, hi_pu: f64, capacity: CapacityTerm) -> Variable {
        match capacity {
            CapacityTerm::Fixed(c) => self.add(variable().min(lo_pu * c).max(hi_pu * c)),
            CapacityTerm::Variable(cap) => {
                let var = self.add(variable().min(0.0));
                self.constraints.push(constraint!(var <= hi_pu * cap));
                if lo_pu > 0.0 {
                    self.constraints.push(constraint!(var >= lo_pu * cap));
                }
                var
            }
        }
    }

    fn add_generator(&mut self, spec: &GeneratorSpec) -> GeneratorVars {
        let p_nom = self.capacity(&spec.p_nom);
        let p = (0..self.n)
            .map(|t| {
                let p = self.bounded(spec.p_min_pu.at(t), spec.p_max_pu.at(t), p_nom);
                self.objective += (spec.marginal_cost.at(t) * self.dt) * p;
                p
            })
            .collect();
        GeneratorVars { p, p_nom }
    }

    fn add_storage(&mut self, spec: &StorageSpec) -> StorageVars {
        let e_nom = self.capacity(&spec.e_nom);
        let dt = self.dt;
        let keep = 1.0 - spec.standing_loss;
        let rating = spec.p_nom.unwrap_or(f64::INFINITY);

        let first: Expression = if spec.cyclic {
            self.bounded(spec.e_min_pu, spec.e_max_pu, e_nom).into()
        } else {
            Expression::from(spec.e_initial)
        };

        let mut e = Vec::with_capacity(self.n + 1);
        e.push(first.clone());
        let mut store = Vec::with_capacity(self.n);
        let mut dispatch = Vec::with_capacity(self.n);

        for t in 0..self.n {
            let charge = self.add(variable().min(0.0).max(rating));
            let discharge = self.add(variable().min(0.0).max(rating));
            let next = self.bounded(spec.e_min_pu, spec.e_max_pu, e_nom);

            let inflow = charge * (spec.efficiency_store * dt) - discharge * (dt / spec.efficiency_dispatch);
            let carried = e[t].clone() * keep;
            self.constraints.push(constraint!(next == carried + inflow));

            // One step can neither store more than the full window nor draw
            // more than what the unit can hold.
            let window = e_nom.expr() * spec.e_max_pu;
            self.constraints
                .push(constraint!(charge * (spec.efficiency_store * dt) <= window));
            let held = e_nom.expr() + spec.e_initial;
            self.constraints
                .push(constraint!(discharge * (dt / spec.efficiency_dispatch) <= held));

            if spec.marginal_cost != 0.0 {
                self.objective += (spec.marginal_cost * dt) * discharge;
            }

            store.push(charge);
            dispatch.push(discharge);
            e.push(next.into());
        }

        if spec.cyclic {
            let last = e[self.n].clone();
            self.constraints.push(constraint!(last == first));
        }

        StorageVars { e, store, dispatch, e_nom }
    }

    fn add_slack(&mut self, penalty: f64) -> BalanceSlack {
        let weight = penalty * self.dt;
        let mut shortfall = Vec::with_capacity(self.n);
        let mut surplus = Vec::with_capacity(self.n);
        for _ in 0..self.n {
            let short = self.add(variable().min(0.0));
            let over = self.add(variable().min(0.0));
            self.objective += weight * short + weight * over;
            shortfall.push(short);
            surplus.push(over);
        }
        BalanceSlack { shortfall, surplus }
    }
}
