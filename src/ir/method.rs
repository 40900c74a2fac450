//! Blocks and methods of the IR view.
//!
//! Instructions are stored as `Rc<IrInstruction>` so that a wrapper handed to a
//! script keeps the identity of the instruction it was built from. Replacing
//! an instruction swaps the `Rc` in its slot; the old instance stays valid for
//! anyone still holding it.

use std::{fmt, rc::Rc};

use crate::ir::IrInstruction;

/// A basic block: an ordered, mutable list of instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct IrBlock {
    id: u32,
    instructions: Vec<Rc<IrInstruction>>,
}

impl IrBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            instructions: Vec::new(),
        }
    }

    /// Creates a block from instructions.
    #[must_use]
    pub fn with_instructions(id: u32, instructions: Vec<IrInstruction>) -> Self {
        Self {
            id,
            instructions: instructions.into_iter().map(Rc::new).collect(),
        }
    }

    /// Returns the block id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the instructions in order.
    #[must_use]
    pub fn instructions(&self) -> &[Rc<IrInstruction>] {
        &self.instructions
    }

    /// Returns the instruction at `index`.
    #[must_use]
    pub fn instruction(&self, index: usize) -> Option<&Rc<IrInstruction>> {
        self.instructions.get(index)
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the block holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Appends an instruction and returns the stored handle.
    pub fn push(&mut self, instruction: IrInstruction) -> Rc<IrInstruction> {
        let rc = Rc::new(instruction);
        self.instructions.push(rc.clone());
        rc
    }

    /// Returns an owned copy of the instruction handles.
    ///
    /// Traversals that may mutate the block iterate over this copy.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<IrInstruction>> {
        self.instructions.clone()
    }

    /// Returns the current index of `instruction`, compared by identity.
    #[must_use]
    pub fn position_of(&self, instruction: &Rc<IrInstruction>) -> Option<usize> {
        self.instructions
            .iter()
            .position(|candidate| Rc::ptr_eq(candidate, instruction))
    }

    /// Removes `instruction` from wherever it currently sits.
    ///
    /// Returns the index it was removed from. Later instructions shift down by
    /// one; earlier ones keep their index.
    pub fn remove_instruction(&mut self, instruction: &Rc<IrInstruction>) -> Option<usize> {
        let index = self.position_of(instruction)?;
        self.instructions.remove(index);
        Some(index)
    }

    /// Replaces `original` with `replacement` at the original's current index.
    ///
    /// Returns the index of the replaced slot.
    pub fn replace_instruction(
        &mut self,
        original: &Rc<IrInstruction>,
        replacement: Rc<IrInstruction>,
    ) -> Option<usize> {
        let index = self.position_of(original)?;
        self.instructions[index] = replacement;
        Some(index)
    }
}

impl fmt::Display for IrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "block_{}:", self.id)?;
        for instr in &self.instructions {
            writeln!(f, "  {instr}")?;
        }
        Ok(())
    }
}

/// A lifted method: an ordered list of blocks, entry block first.
#[derive(Debug, Clone, PartialEq)]
pub struct IrMethod {
    name: String,
    descriptor: String,
    blocks: Vec<IrBlock>,
}

impl IrMethod {
    /// Creates a method from its blocks.
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, blocks: Vec<IrBlock>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            blocks,
        }
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the method descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Returns the blocks in order.
    #[must_use]
    pub fn blocks(&self) -> &[IrBlock] {
        &self.blocks
    }

    /// Returns the blocks for mutation.
    pub fn blocks_mut(&mut self) -> &mut [IrBlock] {
        &mut self.blocks
    }

    /// Returns the entry block.
    #[must_use]
    pub fn entry_block(&self) -> Option<&IrBlock> {
        self.blocks.first()
    }

    /// Returns the block with the given id.
    #[must_use]
    pub fn block(&self, id: u32) -> Option<&IrBlock> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    /// Returns the total number of instructions across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(IrBlock::len).sum()
    }

    /// Iterates every instruction of every block, in block order.
    pub fn instructions(&self) -> impl Iterator<Item = &Rc<IrInstruction>> {
        self.blocks.iter().flat_map(|b| b.instructions().iter())
    }
}

impl fmt::Display for IrMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "method {}{}", self.name, self.descriptor)?;
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}
