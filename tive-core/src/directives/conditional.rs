//! `if` regions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Anchors, Engine};
use crate::dom::{Dom, NodeId};
use crate::error::{Result, TemplateError};
use crate::reactive::Scope;
use crate::region::Region;

struct Conditional {
    engine: Engine,
    dom: Dom,
    template: NodeId,
    anchors: Anchors,
    scope: Rc<Scope>,
    owner: Region,
    shown: Cell<bool>,
    branch: RefCell<Option<Region>>,
}

impl Conditional {
    /// Show or hide the content. Unchanged values do nothing.
    fn apply(&self, show: bool) -> Result<()> {
        if show == self.shown.get() {
            return Ok(());
        }
        if show {
            self.show()?;
        } else {
            self.hide();
        }
        self.shown.set(show);
        Ok(())
    }

    fn show(&self) -> Result<()> {
        let content = self
            .dom
            .clone_content(self.template)
            .ok_or(TemplateError::NotATemplate(self.template))?;
        let branch = self.owner.child("if");
        let walked = self
            .engine
            .walk_children(&self.dom, content, &self.scope, &branch)
            .and_then(|()| self.anchors.insert(&self.dom, content));
        if let Err(err) = walked {
            branch.dispose();
            return Err(err);
        }
        tracing::debug!(anchor = ?self.anchors.start, "if region shown");
        *self.branch.borrow_mut() = Some(branch);
        Ok(())
    }

    fn hide(&self) {
        let removed = self.anchors.clear(&self.dom);
        if let Some(branch) = self.branch.borrow_mut().take() {
            branch.dispose();
        }
        tracing::debug!(anchor = ?self.anchors.start, removed, "if region hidden");
    }
}

pub(super) fn mount(
    engine: &Engine,
    dom: &Dom,
    template: NodeId,
    raw: &str,
    anchors: Anchors,
    scope: &Rc<Scope>,
    region: &Region,
) -> Result<()> {
    let evaluator = engine.evaluator();
    let evaluated = evaluator.evaluate(raw, scope);
    let state = Rc::new(Conditional {
        engine: engine.clone(),
        dom: dom.clone(),
        template,
        anchors,
        scope: Rc::clone(scope),
        owner: region.clone(),
        shown: Cell::new(false),
        branch: RefCell::new(None),
    });
    state.apply(evaluated.value.is_truthy())?;

    let Some(expression) = evaluated.expression else {
        return Ok(());
    };
    let watcher = scope.host().watcher();
    for dep in &evaluated.deps {
        let owner = state.owner.clone();
        let state = Rc::clone(&state);
        let evaluator = Rc::clone(evaluator);
        let expression = expression.clone();
        watcher.add_owned_listener(dep, &owner, move |_| {
            let show = evaluator.eval(&expression, &state.scope).is_truthy();
            if let Err(err) = state.apply(show) {
                tracing::error!(error = %err, expression = expression.as_str(), "if region update failed");
            }
        });
    }
    Ok(())
}
