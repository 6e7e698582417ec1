use crate::config::ActuatorBinding;

/// Color to digital output mapping. Outputs are mutually exclusive.
#[derive(Debug, Clone)]
pub struct ActuatorMap {
    bindings: Vec<ActuatorBinding>,
}

impl ActuatorMap {
    pub fn new(bindings: Vec<ActuatorBinding>) -> Self {
        Self { bindings }
    }

    pub fn pin_for(&self, color: &str) -> Option<u8> {
        self.bindings
            .iter()
            .find(|binding| binding.color == color)
            .map(|binding| binding.pin)
    }

    pub fn pins(&self) -> impl Iterator<Item = u8> + '_ {
        self.bindings.iter().map(|binding| binding.pin)
    }

    /// Every output except `pin`, in configured order.
    pub fn others(&self, pin: u8) -> impl Iterator<Item = u8> + '_ {
        self.pins().filter(move |p| *p != pin)
    }
}
