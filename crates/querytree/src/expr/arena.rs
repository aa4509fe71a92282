use super::{ColumnRef, ExprId, ExprParent, Expression, is_valid_parameter_key};
use crate::error::{ModelError, ModelResult};
use crate::model::{
    BinaryDescription, ColumnDescription, ConstantDescription, ConstantType,
    ExpressionDescription, ExpressionDescriptionKind, MissingDescription, ParameterDescription,
    StarDescription,
};

#[derive(Debug, Clone)]
struct ExprNode {
    parent: ExprParent,
    expr: Expression,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<ExprNode>,
}

/// Storage for all expression nodes of one query.
///
/// Released slots go on a free list and are reused under a bumped
/// generation, so an old [`ExprId`] can never alias a newer node.
#[derive(Debug, Clone, Default)]
pub struct ExprArena {
    slots: Vec<Slot>,
    free_list: Vec<usize>,
    live: usize,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots ever allocated, live or free.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn contains(&self, id: ExprId) -> bool {
        self.node(id).is_ok()
    }

    fn node(&self, id: ExprId) -> ModelResult<&ExprNode> {
        match self.slots.get(id.index) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation => Ok(node),
            _ => Err(ModelError::StaleExpression(id)),
        }
    }

    fn node_mut(&mut self, id: ExprId) -> ModelResult<&mut ExprNode> {
        match self.slots.get_mut(id.index) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation => Ok(node),
            _ => Err(ModelError::StaleExpression(id)),
        }
    }

    pub fn get(&self, id: ExprId) -> ModelResult<&Expression> {
        self.node(id).map(|n| &n.expr)
    }

    pub(crate) fn get_mut(&mut self, id: ExprId) -> ModelResult<&mut Expression> {
        self.node_mut(id).map(|n| &mut n.expr)
    }

    pub fn parent_of(&self, id: ExprId) -> ModelResult<ExprParent> {
        self.node(id).map(|n| n.parent)
    }

    fn alloc(&mut self, parent: ExprParent, expr: Expression) -> ExprId {
        let node = Some(ExprNode { parent, expr });
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index];
            slot.node = node;
            return ExprId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node,
        });
        ExprId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Build the tree described by `desc` below `parent`.
    ///
    /// On failure nothing stays allocated.
    pub(crate) fn load(
        &mut self,
        desc: &ExpressionDescription,
        parent: ExprParent,
    ) -> ModelResult<ExprId> {
        let expr = match desc.kind()? {
            ExpressionDescriptionKind::Column(c) => Expression::Column(ColumnRef {
                column: c.column.clone(),
                table: c.table.clone(),
                alias: c.alias.clone(),
            }),
            ExpressionDescriptionKind::Constant(c) => Expression::Constant {
                ty: c.ty,
                value: c.value.clone(),
            },
            ExpressionDescriptionKind::Missing => Expression::Missing,
            ExpressionDescriptionKind::Parameter(p) => {
                if !is_valid_parameter_key(&p.key) {
                    return Err(ModelError::InvalidParameterKey(p.key.clone()));
                }
                Expression::Parameter { key: p.key.clone() }
            }
            ExpressionDescriptionKind::Star(s) => Expression::Star {
                limited_to: s.limited_to.clone(),
            },
            ExpressionDescriptionKind::Binary(b) => return self.load_binary(b, parent),
        };
        Ok(self.alloc(parent, expr))
    }

    fn load_binary(&mut self, desc: &BinaryDescription, parent: ExprParent) -> ModelResult<ExprId> {
        // Reserve the slot first so the operands can point at it.
        let id = self.alloc(parent, Expression::Missing);

        let lhs = match self.load(&desc.lhs, ExprParent::Expr(id)) {
            Ok(lhs) => lhs,
            Err(e) => {
                self.release(id);
                return Err(e);
            }
        };
        let rhs = match self.load(&desc.rhs, ExprParent::Expr(id)) {
            Ok(rhs) => rhs,
            Err(e) => {
                self.release(lhs);
                self.release(id);
                return Err(e);
            }
        };

        if let Ok(node) = self.node_mut(id) {
            node.expr = Expression::Binary {
                lhs,
                operator: desc.operator.clone(),
                rhs,
                simple: desc.simple,
            };
        }
        Ok(id)
    }

    /// Free `id` and everything below it.
    pub(crate) fn release(&mut self, id: ExprId) {
        let Some(slot) = self.slots.get_mut(id.index) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;

        if let Expression::Binary { lhs, rhs, .. } = node.expr {
            self.release(lhs);
            self.release(rhs);
        }
    }

    /// Swap operand `old` of binary `binary` for the already loaded `new`.
    pub(crate) fn replace_operand(
        &mut self,
        binary: ExprId,
        old: ExprId,
        new: ExprId,
    ) -> ModelResult<()> {
        let node = self.node_mut(binary)?;
        match &mut node.expr {
            Expression::Binary { lhs, rhs, .. } => {
                if *lhs == old {
                    *lhs = new;
                } else if *rhs == old {
                    *rhs = new;
                } else {
                    return Err(ModelError::not_a_child(ExprParent::Expr(binary).to_string(), old));
                }
                Ok(())
            }
            leaf => Err(ModelError::LeafHasNoChildren(leaf.kind_name())),
        }
    }

    /// Check that `child` is an operand of `parent` without changing anything.
    pub(crate) fn check_operand(&self, parent: ExprId, child: ExprId) -> ModelResult<()> {
        match self.get(parent)? {
            Expression::Binary { lhs, rhs, .. } if *lhs == child || *rhs == child => Ok(()),
            Expression::Binary { .. } => Err(ModelError::not_a_child(
                ExprParent::Expr(parent).to_string(),
                child,
            )),
            leaf => Err(ModelError::LeafHasNoChildren(leaf.kind_name())),
        }
    }

    /// `false` if the subtree contains a `Missing` node (or a stale handle).
    pub fn is_complete(&self, id: ExprId) -> bool {
        match self.get(id) {
            Ok(Expression::Missing) | Err(_) => false,
            Ok(Expression::Binary { lhs, rhs, .. }) => self.is_complete(*lhs) && self.is_complete(*rhs),
            Ok(_) => true,
        }
    }

    /// Visit every node of the subtree rooted at `id`, parents before children.
    pub fn walk<'a>(&'a self, id: ExprId, f: &mut impl FnMut(ExprId, &'a Expression)) {
        let Ok(expr) = self.get(id) else {
            return;
        };
        f(id, expr);
        if let Expression::Binary { lhs, rhs, .. } = expr {
            self.walk(*lhs, f);
            self.walk(*rhs, f);
        }
    }

    /// Rebuild the wire description of the subtree rooted at `id`.
    pub fn to_model(&self, id: ExprId) -> ModelResult<ExpressionDescription> {
        let desc = match self.get(id)? {
            Expression::Constant { ty, value } => ExpressionDescription {
                constant: Some(ConstantDescription {
                    ty: *ty,
                    value: value.clone(),
                }),
                ..ExpressionDescription::default()
            },
            Expression::Column(c) => ExpressionDescription {
                single_column: Some(ColumnDescription {
                    column: c.column.clone(),
                    table: c.table.clone(),
                    alias: c.alias.clone(),
                }),
                ..ExpressionDescription::default()
            },
            Expression::Star { limited_to } => ExpressionDescription {
                star: Some(StarDescription {
                    limited_to: limited_to.clone(),
                }),
                ..ExpressionDescription::default()
            },
            Expression::Parameter { key } => ExpressionDescription {
                parameter: Some(ParameterDescription { key: key.clone() }),
                ..ExpressionDescription::default()
            },
            Expression::Binary {
                lhs,
                operator,
                rhs,
                simple,
            } => ExpressionDescription {
                binary: Some(Box::new(BinaryDescription {
                    lhs: self.to_model(*lhs)?,
                    operator: operator.clone(),
                    rhs: self.to_model(*rhs)?,
                    simple: *simple,
                })),
                ..ExpressionDescription::default()
            },
            Expression::Missing => ExpressionDescription {
                missing: Some(MissingDescription {}),
                ..ExpressionDescription::default()
            },
        };
        Ok(desc)
    }

    /// Render the subtree rooted at `id` as SQL.
    ///
    /// Fails with [`ModelError::IncompleteExpression`] if a `Missing` node is present.
    pub fn to_sql(&self, id: ExprId) -> ModelResult<String> {
        // Surface stale handles as such rather than as incompleteness.
        self.get(id)?;
        if !self.is_complete(id) {
            return Err(ModelError::IncompleteExpression);
        }
        let mut out = String::new();
        self.write_sql(id, &mut out)?;
        Ok(out)
    }

    fn write_sql(&self, id: ExprId, out: &mut String) -> ModelResult<()> {
        match self.get(id)? {
            Expression::Constant { ty, value } => match ty {
                ConstantType::Integer | ConstantType::Real => out.push_str(value),
                ConstantType::Text => {
                    out.push('"');
                    out.push_str(value);
                    out.push('"');
                }
            },
            Expression::Column(c) => {
                if let Some(q) = c.qualifier() {
                    out.push_str(q);
                    out.push('.');
                }
                out.push_str(&c.column);
            }
            Expression::Star { limited_to } => {
                if let Some(t) = limited_to {
                    out.push_str(t.alias.as_deref().unwrap_or(&t.name));
                    out.push('.');
                }
                out.push('*');
            }
            Expression::Parameter { key } => {
                out.push('@');
                out.push_str(key);
            }
            Expression::Binary {
                lhs, operator, rhs, ..
            } => {
                self.write_sql(*lhs, out)?;
                out.push(' ');
                out.push_str(operator);
                out.push(' ');
                self.write_sql(*rhs, out)?;
            }
            Expression::Missing => return Err(ModelError::IncompleteExpression),
        }
        Ok(())
    }
}
