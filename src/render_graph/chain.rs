//! Multi-pass post effects as a single ordered chain.

use crate::render_graph::RenderPass;

/// An ordered run of passes where each samples an earlier one's output.
///
/// The head receives the active camera's matrices every frame; everything
/// after it draws fixed quads. The orchestrator runs [`leading`](Self::leading)
/// before the main view and [`last`](Self::last) after it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassChain {
    passes: Vec<RenderPass>,
}

impl PassChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pass, returning its position in the chain.
    pub fn push(&mut self, pass: RenderPass) -> usize {
        self.passes.push(pass);
        self.passes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenderPass> {
        self.passes.iter()
    }

    pub fn get(&self, index: usize) -> Option<&RenderPass> {
        self.passes.get(index)
    }

    /// Every pass but the last.
    ///
    /// # Panics
    ///
    /// Panics if the chain is empty.
    pub fn leading(&self) -> &[RenderPass] {
        let (_, leading) = self.split();
        leading
    }

    /// The composite pass that runs after the main view.
    ///
    /// # Panics
    ///
    /// Panics if the chain is empty.
    pub fn last(&self) -> &RenderPass {
        let (last, _) = self.split();
        last
    }

    fn split(&self) -> (&RenderPass, &[RenderPass]) {
        match self.passes.split_last() {
            Some(split) => split,
            None => panic!("pass chain is empty"),
        }
    }
}

impl<'a> IntoIterator for &'a PassChain {
    type Item = &'a RenderPass;
    type IntoIter = std::slice::Iter<'a, RenderPass>;

    fn into_iter(self) -> Self::IntoIter {
        self.passes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;

    fn chain(labels: &[&str]) -> PassChain {
        let mut chain = PassChain::new();
        for label in labels {
            chain.push(RenderPass::new(*label, Viewport::new(0, 0, 4, 4)));
        }
        chain
    }

    #[test]
    fn leading_excludes_the_composite() {
        let chain = chain(&["capture", "blur", "composite"]);
        let labels: Vec<_> = chain.leading().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["capture", "blur"]);
        assert_eq!(chain.last().label, "composite");
    }

    #[test]
    fn single_pass_chain_has_no_leading_passes() {
        let chain = chain(&["only"]);
        assert!(chain.leading().is_empty());
        assert_eq!(chain.last().label, "only");
    }

    #[test]
    #[should_panic(expected = "pass chain is empty")]
    fn empty_chain_has_no_composite() {
        PassChain::new().last();
    }
}
