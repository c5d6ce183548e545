//! `html` regions.

use std::cell::RefCell;
use std::rc::Rc;

use super::{Anchors, Engine};
use crate::dom::Dom;
use crate::error::Result;
use crate::reactive::Scope;
use crate::region::Region;
use crate::value::Value;

struct Markup {
    engine: Engine,
    dom: Dom,
    anchors: Anchors,
    scope: Rc<Scope>,
    owner: Region,
    content: RefCell<Option<Region>>,
}

impl Markup {
    /// Replace the region's content with `value` parsed as markup.
    fn render(&self, value: &Value) -> Result<()> {
        self.anchors.clear(&self.dom);
        if let Some(previous) = self.content.borrow_mut().take() {
            previous.dispose();
        }

        let markup = value.to_string();
        if markup.is_empty() {
            return Ok(());
        }
        let fragment = match self.dom.parse_fragment(&markup) {
            Ok(fragment) => fragment,
            Err(err) => {
                tracing::warn!(error = %err, "html value is not valid markup; region left empty");
                return Ok(());
            }
        };
        let region = self.owner.child("html");
        let walked = self
            .engine
            .walk_children(&self.dom, fragment, &self.scope, &region)
            .and_then(|()| self.anchors.insert(&self.dom, fragment));
        if let Err(err) = walked {
            region.dispose();
            return Err(err);
        }
        *self.content.borrow_mut() = Some(region);
        Ok(())
    }
}

pub(super) fn mount(
    engine: &Engine,
    dom: &Dom,
    raw: &str,
    anchors: Anchors,
    scope: &Rc<Scope>,
    region: &Region,
) -> Result<()> {
    let evaluator = engine.evaluator();
    let evaluated = evaluator.evaluate(raw, scope);
    let state = Rc::new(Markup {
        engine: engine.clone(),
        dom: dom.clone(),
        anchors,
        scope: Rc::clone(scope),
        owner: region.clone(),
        content: RefCell::new(None),
    });
    state.render(&evaluated.value)?;

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
            let value = evaluator.eval(&expression, &state.scope);
            if let Err(err) = state.render(&value) {
                tracing::error!(error = %err, "html region update failed");
            }
        });
    }
    Ok(())
}
