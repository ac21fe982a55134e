//! Selection state for reviewing dependencies

use crate::model::NetworkDependency;

#[derive(Debug, Clone)]
struct Item {
    dep: NetworkDependency,
    selected: bool,
}

/// A list of dependencies, each toggled in or out. Everything starts selected.
#[derive(Debug, Clone)]
pub struct Picker {
    items: Vec<Item>,
}

impl Picker {
    pub fn new(deps: Vec<NetworkDependency>) -> Self {
        Self {
            items: deps
                .into_iter()
                .map(|dep| Item {
                    dep,
                    selected: true,
                })
                .collect(),
        }
    }

    /// Flips item `index`; out-of-range indexes are ignored
    pub fn toggle(&mut self, index: usize) {
        if let Some(item) = self.items.get_mut(index) {
            item.selected = !item.selected;
        }
    }

    pub fn select_all(&mut self) {
        self.items.iter_mut().for_each(|i| i.selected = true);
    }

    pub fn select_none(&mut self) {
        self.items.iter_mut().for_each(|i| i.selected = false);
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.items.get(index).is_some_and(|i| i.selected)
    }

    /// Selected dependencies in their original order
    pub fn selected(&self) -> Vec<NetworkDependency> {
        self.items
            .iter()
            .filter(|i| i.selected)
            .map(|i| i.dep.clone())
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|i| i.selected).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Display line for item `index`: checkbox, key fields and description
    pub fn line(&self, index: usize) -> Option<String> {
        self.items.get(index).map(|item| {
            let dep = &item.dep;
            format!(
                "{} {} -> {}:{}/{}  [{}]  {}",
                if item.selected { "[x]" } else { "[ ]" },
                dep.source,
                dep.target,
                dep.port,
                dep.protocol,
                dep.confidence,
                dep.description
            )
        })
    }
}
