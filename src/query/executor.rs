//! Query executor
//!
//! Execution flow:
//! 1. Seed with every document (`OneBitSet`) when there is no filter
//! 2. Evaluate each top-level condition into a scratch set and AND it into
//!    the running selection; stop at the first empty intersection
//! 3. Walk the first order-by index's rank groups, refining each group by
//!    the next order-by recursively; without order-by, walk ids ascending
//! 4. Apply skip and limit as a counted drop and take
//! 5. Hand each surviving document and its payload to the processor until
//!    it asks to stop
//!
//! Documents tied on every order-by field come out in id order. Documents
//! without a value for an order-by field follow all documents that have
//! one, in both directions.

use crate::bitset::{ArrayBitSet, BitSet, OneBitSet, PoolResult, ScratchPool, ZeroBitSet};
use crate::buffer::Buffer;
use crate::index::{FilterableIndex, SortableIndex};

use super::builder::Order;
use super::condition::Condition;

/// What the executor reads from a database
pub trait QuerySource {
    /// Documents in the snapshot
    fn document_count(&self) -> usize;

    /// Filterable index of `field`, if the snapshot has one
    fn filterable(&self, field: &str) -> Option<&FilterableIndex>;

    /// Sortable index of `field`, if the snapshot has one
    fn sortable(&self, field: &str) -> Option<&SortableIndex>;

    /// Payload of `document`
    fn payload(&self, document: usize) -> Option<Buffer>;
}

/// Receives matching documents; returning `false` stops the query
pub trait DocumentProcessor {
    fn process(&mut self, document: usize, payload: Buffer) -> bool;
}

impl<F> DocumentProcessor for F
where
    F: FnMut(usize, Buffer) -> bool,
{
    fn process(&mut self, document: usize, payload: Buffer) -> bool {
        self(document, payload)
    }
}

/// Skip and limit bookkeeping, shared across the databases of a composite
#[derive(Debug, Clone)]
pub struct Pager {
    to_skip: usize,
    remaining: Option<usize>,
    emitted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admit {
    Skip,
    Take,
    Stop,
}

impl Pager {
    pub fn new(skip: usize, limit: Option<usize>) -> Self {
        Self {
            to_skip: skip,
            remaining: limit,
            emitted: 0,
        }
    }

    /// Returns true once the limit is reached
    pub fn is_done(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Documents handed to the processor so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn admit(&mut self) -> Admit {
        if self.is_done() {
            return Admit::Stop;
        }
        if self.to_skip > 0 {
            self.to_skip -= 1;
            return Admit::Skip;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        self.emitted += 1;
        Admit::Take
    }
}

/// Documents surviving the filter
pub enum Selection {
    /// No filter: every document
    All(OneBitSet),
    /// Scratch set holding the matches
    Matched(ArrayBitSet),
    /// Nothing survived
    Empty(ZeroBitSet),
}

impl Selection {
    pub fn bits(&self) -> &dyn BitSet {
        match self {
            Selection::All(bits) => bits,
            Selection::Matched(bits) => bits,
            Selection::Empty(bits) => bits,
        }
    }

    pub fn cardinality(&self) -> usize {
        self.bits().cardinality()
    }
}

/// Runs one query against one source with one scratch pool
pub struct Executor<'q, S: QuerySource + ?Sized> {
    source: &'q S,
    scratch: ScratchPool<'q>,
}

impl<'q, S: QuerySource + ?Sized> Executor<'q, S> {
    pub fn new(source: &'q S, scratch: ScratchPool<'q>) -> Self {
        Self { source, scratch }
    }

    /// Evaluates the ANDed top-level conditions
    pub fn select(&mut self, conditions: &[Condition]) -> PoolResult<Selection> {
        let size = self.source.document_count();
        let Some((first, rest)) = conditions.split_first() else {
            return Ok(Selection::All(OneBitSet::new(size)));
        };

        let mut selected = self.scratch.borrow()?;
        let mut alive = self.eval(first, &mut selected)?;
        for condition in rest {
            if !alive {
                break;
            }
            let mut matched = self.scratch.borrow()?;
            alive = self.eval(condition, &mut matched)? && selected.and(&matched);
            self.scratch.give_back(matched)?;
        }
        if alive {
            Ok(Selection::Matched(selected))
        } else {
            self.scratch.give_back(selected)?;
            Ok(Selection::Empty(ZeroBitSet::new(size)))
        }
    }

    /// ORs the documents matching `condition` into `dest` and returns
    /// whether any matched
    fn eval(&mut self, condition: &Condition, dest: &mut ArrayBitSet) -> PoolResult<bool> {
        let source = self.source;
        let matched = match condition {
            Condition::Eq { field, value } => source
                .filterable(field)
                .map_or(false, |index| index.eq(dest, value)),
            Condition::In { field, values } => source
                .filterable(field)
                .map_or(false, |index| index.in_values(dest, values.iter())),
            Condition::Less {
                field,
                value,
                inclusive,
            } => source
                .filterable(field)
                .map_or(false, |index| index.less_than(dest, value, *inclusive)),
            Condition::Greater {
                field,
                value,
                inclusive,
            } => source
                .filterable(field)
                .map_or(false, |index| index.greater_than(dest, value, *inclusive)),
            Condition::Between {
                field,
                from,
                from_inclusive,
                to,
                to_inclusive,
            } => source.filterable(field).map_or(false, |index| {
                index.between(dest, from, *from_inclusive, to, *to_inclusive)
            }),
            Condition::And(children) => self.eval_and(children, dest)?,
            Condition::Or(children) => {
                let mut any = false;
                for child in children {
                    any |= self.eval(child, dest)?;
                }
                any
            }
            Condition::Not(child) => {
                let mut inner = self.scratch.borrow()?;
                self.eval(child, &mut inner)?;
                inner.flip_all();
                let any = !inner.is_empty();
                if any {
                    dest.or(&inner);
                }
                self.scratch.give_back(inner)?;
                any
            }
        };
        Ok(matched)
    }

    fn eval_and(&mut self, children: &[Condition], dest: &mut ArrayBitSet) -> PoolResult<bool> {
        let Some((first, rest)) = children.split_first() else {
            return Ok(false);
        };
        let mut acc = self.scratch.borrow()?;
        let mut alive = self.eval(first, &mut acc)?;
        for child in rest {
            if !alive {
                break;
            }
            let mut matched = self.scratch.borrow()?;
            alive = self.eval(child, &mut matched)? && acc.and(&matched);
            self.scratch.give_back(matched)?;
        }
        if alive {
            dest.or(&acc);
        }
        self.scratch.give_back(acc)?;
        Ok(alive)
    }

    /// Streams the selection in order. Returns false if the processor or
    /// the limit stopped the stream.
    pub fn emit(
        &mut self,
        selection: &Selection,
        orders: &[Order],
        pager: &mut Pager,
        processor: &mut dyn DocumentProcessor,
    ) -> PoolResult<bool> {
        if pager.is_done() {
            return Ok(false);
        }
        let docs = selection.bits();
        if docs.is_empty() {
            return Ok(true);
        }
        self.emit_ordered(docs, orders, pager, processor)
    }

    fn emit_ordered(
        &mut self,
        docs: &dyn BitSet,
        orders: &[Order],
        pager: &mut Pager,
        processor: &mut dyn DocumentProcessor,
    ) -> PoolResult<bool> {
        let Some((order, rest)) = orders.split_first() else {
            return Ok(self.emit_id_order(docs, pager, processor));
        };
        let source = self.source;
        let Some(sorter) = source.sortable(&order.field) else {
            // Field absent from this snapshot: every document ties
            return self.emit_ordered(docs, rest, pager, processor);
        };

        let groups = if order.is_descending() {
            sorter.descending(docs)
        } else {
            sorter.ascending(docs)
        };
        let mut group_set: Option<ArrayBitSet> = None;
        let mut go = true;
        for (_, members) in groups {
            go = self.emit_group(&members, rest, &mut group_set, pager, processor)?;
            if !go {
                break;
            }
        }
        if go {
            let missing = sorter.unranked(docs);
            go = self.emit_group(&missing, rest, &mut group_set, pager, processor)?;
        }
        if let Some(set) = group_set {
            self.scratch.give_back(set)?;
        }
        Ok(go)
    }

    /// Emits ascending `members`, refined by `rest` when more than one
    fn emit_group(
        &mut self,
        members: &[usize],
        rest: &[Order],
        group_set: &mut Option<ArrayBitSet>,
        pager: &mut Pager,
        processor: &mut dyn DocumentProcessor,
    ) -> PoolResult<bool> {
        if rest.is_empty() || members.len() < 2 {
            return Ok(self.emit_ids(members, pager, processor));
        }
        let mut set = match group_set.take() {
            Some(set) => set,
            None => self.scratch.borrow()?,
        };
        for &doc in members {
            set.set(doc);
        }
        let go = self.emit_ordered(&set, rest, pager, processor);
        for &doc in members {
            set.unset(doc);
        }
        *group_set = Some(set);
        go
    }

    fn emit_ids(
        &self,
        members: &[usize],
        pager: &mut Pager,
        processor: &mut dyn DocumentProcessor,
    ) -> bool {
        members
            .iter()
            .all(|&doc| self.emit_one(doc, pager, processor))
    }

    fn emit_id_order(
        &self,
        docs: &dyn BitSet,
        pager: &mut Pager,
        processor: &mut dyn DocumentProcessor,
    ) -> bool {
        let mut next = docs.next_set_bit(0);
        while let Some(doc) = next {
            if !self.emit_one(doc, pager, processor) {
                return false;
            }
            next = docs.next_set_bit(doc + 1);
        }
        true
    }

    fn emit_one(
        &self,
        document: usize,
        pager: &mut Pager,
        processor: &mut dyn DocumentProcessor,
    ) -> bool {
        match pager.admit() {
            Admit::Skip => true,
            Admit::Stop => false,
            Admit::Take => {
                let Some(payload) = self.source.payload(document) else {
                    return true;
                };
                processor.process(document, payload) && !pager.is_done()
            }
        }
    }

    /// Hands back the selection's scratch set
    pub fn recycle(&mut self, selection: Selection) -> PoolResult<()> {
        if let Selection::Matched(set) = selection {
            self.scratch.give_back(set)?;
        }
        Ok(())
    }

    /// Ends the query and returns how many scratch sets it borrowed
    pub fn finish(mut self) -> PoolResult<usize> {
        self.scratch.release()?;
        Ok(self.scratch.borrowed_total())
    }
}
