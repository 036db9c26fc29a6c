use crate::{
    executor::{data::Data, task::Task},
    types::{error::Result, value::Value},
};

/// Nested-loop inner join.
///
/// For every left row the right cursor is rewound and scanned in full; a
/// combined row (left columns, then right columns) is produced per match.
/// `on` holds the key columns relative to each side; without it every pair
/// matches and the task yields the cross product.
pub struct JoinTask<'a> {
    left: Box<dyn Data + 'a>,
    right: Box<dyn Data + 'a>,
    on: Option<(usize, usize)>,
    left_width: usize,
    left_active: bool,
}

impl<'a> JoinTask<'a> {
    pub fn new(left: Box<dyn Data + 'a>, right: Box<dyn Data + 'a>, on: (usize, usize)) -> Self {
        Self::build(left, right, Some(on))
    }

    pub fn cross(left: Box<dyn Data + 'a>, right: Box<dyn Data + 'a>) -> Self {
        Self::build(left, right, None)
    }

    fn build(left: Box<dyn Data + 'a>, right: Box<dyn Data + 'a>, on: Option<(usize, usize)>) -> Self {
        let left_width = left.column_count();
        Self {
            left,
            right,
            on,
            left_width,
            left_active: false,
        }
    }

    fn keys_match(&self) -> Result<bool> {
        match self.on {
            None => Ok(true),
            Some((l, r)) => Ok(self.left.get(l)?.sql_eq(self.right.get(r)?)),
        }
    }
}

impl<'a> Task<'a> for JoinTask<'a> {
    fn run(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_data(self: Box<Self>) -> Result<Box<dyn Data + 'a>> {
        Ok(self)
    }
}

impl Data for JoinTask<'_> {
    fn next(&mut self) -> Result<bool> {
        loop {
            if !self.left_active {
                if !self.left.next()? {
                    return Ok(false);
                }
                self.right.rewind()?;
                self.left_active = true;
            }
            while self.right.next()? {
                if self.keys_match()? {
                    return Ok(true);
                }
            }
            self.left_active = false;
        }
    }

    fn get(&self, index: usize) -> Result<&Value> {
        if index < self.left_width {
            self.left.get(index)
        } else {
            self.right.get(index - self.left_width)
        }
    }

    fn column_count(&self) -> usize {
        self.left_width + self.right.column_count()
    }

    fn rewind(&mut self) -> Result<()> {
        self.left_active = false;
        self.left.rewind()
    }
}
