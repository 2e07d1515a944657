/// Column-oriented per-timestep thermodynamic output of one simulation task.
///
/// Columns mirror the simulation engine's thermo print-out: energies in eV,
/// temperature in K, pressure in bar, volume in Å³. `restraint` is the harmonic
/// reference-system energy term (`Es`), `deep` the target-model interaction
/// term (`Ed`); the meaning of both under the coupling depends on the stage kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskOutput {
    pub lambda: f64,
    pub kinetic: Vec<f64>,
    pub potential: Vec<f64>,
    pub total: Vec<f64>,
    pub enthalpy: Vec<f64>,
    pub temperature: Vec<f64>,
    pub pressure: Vec<f64>,
    pub volume: Vec<f64>,
    pub restraint: Vec<f64>,
    pub deep: Vec<f64>,
}

impl TaskOutput {
    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }
}

/// One simulation unit: a lambda value plus the (eventually attached) output.
///
/// A task is identified by its position in the stage's schedule. Its output is
/// absent until the external simulation layer completes, and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Task {
    index: usize,
    lambda: f64,
    output: Option<TaskOutput>,
}

impl Task {
    pub fn new(index: usize, lambda: f64) -> Self {
        Self {
            index,
            lambda,
            output: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn output(&self) -> Option<&TaskOutput> {
        self.output.as_ref()
    }

    /// Attaches the completed simulation output. A task's output is write-once;
    /// attaching twice is a caller bug.
    pub fn attach_output(&mut self, output: TaskOutput) {
        debug_assert!(self.output.is_none());
        self.output = Some(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_has_no_output() {
        let task = Task::new(3, 0.25);
        assert_eq!(task.index(), 3);
        assert_eq!(task.lambda(), 0.25);
        assert!(task.output().is_none());
    }

    #[test]
    fn attached_output_is_readable() {
        let mut task = Task::new(0, 0.5);
        task.attach_output(TaskOutput {
            lambda: 0.5,
            total: vec![1.0, 2.0],
            ..Default::default()
        });
        assert_eq!(task.output().unwrap().len(), 2);
    }
}
