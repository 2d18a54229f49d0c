use std::fmt;

/// Ordered list of inline `style` declarations.
///
/// Declarations keep their insertion order so that a reset-then-apply
/// sequence always serializes to the same attribute value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(source: &str) -> Self {
        let declarations = source
            .split(';')
            .filter_map(|declaration| {
                let (name, value) = declaration.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim();
                (!name.is_empty() && !value.is_empty()).then(|| (name, value.to_string()))
            })
            .collect();
        Self { declarations }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// Replace an existing declaration in place or append a new one.
    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self
            .declarations
            .iter_mut()
            .find(|(existing, _)| *existing == name)
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.declarations.push((name, value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.declarations.len();
        self.declarations.retain(|(existing, _)| existing != name);
        before != self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.declarations.retain(|(name, value)| keep(name, value));
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.declarations.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}
