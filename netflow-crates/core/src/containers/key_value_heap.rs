//! A max-heap over keys `[0, ..., n - 1]` whose values can be raised and lowered, and whose keys
//! can be (temporarily) taken out of the heap and put back with their old value.
use std::ops::AddAssign;
use std::ops::SubAssign;

use super::KeyedVec;
use super::StorageKey;
use crate::netflow_assert_moderate;

/// A [max-heap](https://en.wikipedia.org/wiki/Binary_heap) which allows for generalised `Key`s
/// (required to implement [`StorageKey`]) and ordered `Value`s.
///
/// Keys have to be added in order of their index through [`KeyValueHeap::grow`].
#[derive(Debug, Clone)]
pub struct KeyValueHeap<Key, Value> {
    /// The values laid out as a binary heap; the value of key `i` is at
    /// `values[map_key_to_position[i]]`.
    values: Vec<Value>,
    map_key_to_position: KeyedVec<Key, usize>,
    map_position_to_key: Vec<Key>,
    /// Positions `[0, end_position)` hold the keys which are present, the others are removed.
    end_position: usize,
}

impl<Key: StorageKey, Value> Default for KeyValueHeap<Key, Value> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            map_key_to_position: KeyedVec::default(),
            map_position_to_key: Vec::new(),
            end_position: 0,
        }
    }
}

impl<Key, Value> KeyValueHeap<Key, Value>
where
    Key: StorageKey + Copy,
    Value: AddAssign<Value> + SubAssign<Value> + PartialOrd + Copy,
{
    /// Deletes the key with maximum value from the heap and returns it, or `None` if there are no
    /// present keys.
    pub(crate) fn pop_max(&mut self) -> Option<Key> {
        if self.end_position == 0 {
            return None;
        }

        let best_key = self.map_position_to_key[0];
        self.delete_key(best_key);
        Some(best_key)
    }

    #[cfg(test)]
    pub(crate) fn get_value(&self, key: Key) -> Value {
        self.values[self.map_key_to_position[key]]
    }

    /// Raises the value of `key`, also when the key is currently removed.
    pub(crate) fn increment(&mut self, key: Key, increment: Value) {
        let position = self.map_key_to_position[key];
        self.values[position] += increment;
        if self.is_key_present(key) {
            self.sift_up(position);
        }
    }

    /// Lowers the value of `key`, also when the key is currently removed.
    pub(crate) fn decrement(&mut self, key: Key, decrement: Value) {
        let position = self.map_key_to_position[key];
        self.values[position] -= decrement;
        if self.is_key_present(key) {
            self.sift_down(position);
        }
    }

    /// Puts a removed key back into the heap with the value it had; does nothing if the key is
    /// present.
    pub(crate) fn restore_key(&mut self, key: Key) {
        if !self.is_key_present(key) {
            let position = self.map_key_to_position[key];
            netflow_assert_moderate!(position >= self.end_position);
            self.swap_positions(position, self.end_position);
            self.end_position += 1;
            self.sift_up(self.end_position - 1);
        }
    }

    /// Takes a key out of the heap without forgetting its value; does nothing if the key is
    /// already removed.
    pub(crate) fn delete_key(&mut self, key: Key) {
        if self.is_key_present(key) {
            let position = self.map_key_to_position[key];
            self.swap_positions(position, self.end_position - 1);
            self.end_position -= 1;
            if position < self.end_position {
                // The element moved into `position` may be larger or smaller than its new
                // surroundings.
                let moved_key = self.map_position_to_key[position];
                self.sift_up(position);
                self.sift_down(self.map_key_to_position[moved_key]);
            }
        }
    }

    pub(crate) fn num_present_keys(&self) -> usize {
        self.end_position
    }

    pub(crate) fn is_key_present(&self, key: Key) -> bool {
        key.index() < self.map_key_to_position.len()
            && self.map_key_to_position[key] < self.end_position
    }

    /// Adds `key` with the given value. The index of `key` has to be the number of keys added so
    /// far.
    pub(crate) fn grow(&mut self, key: Key, value: Value) {
        let last_position = self.values.len();
        netflow_assert_moderate!(key.index() == last_position);

        self.values.push(value);
        let _ = self.map_key_to_position.push(last_position);
        self.map_position_to_key.push(key);

        self.swap_positions(self.end_position, last_position);
        self.end_position += 1;
        self.sift_up(self.end_position - 1);
    }

    fn swap_positions(&mut self, a: usize, b: usize) {
        let key_a = self.map_position_to_key[a];
        let key_b = self.map_position_to_key[b];

        self.values.swap(a, b);
        self.map_position_to_key.swap(a, b);
        self.map_key_to_position[key_a] = b;
        self.map_key_to_position[key_b] = a;
    }

    fn sift_up(&mut self, position: usize) {
        let mut position = position;
        while position > 0 {
            let parent_position = (position - 1) / 2;
            if self.values[parent_position] < self.values[position] {
                self.swap_positions(parent_position, position);
                position = parent_position;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, position: usize) {
        let mut position = position;
        loop {
            let left_child = 2 * position + 1;
            if left_child >= self.end_position {
                return;
            }

            let right_child = left_child + 1;
            let largest_child = if right_child < self.end_position
                && self.values[right_child] > self.values[left_child]
            {
                right_child
            } else {
                left_child
            };

            if self.values[position] < self.values[largest_child] {
                self.swap_positions(position, largest_child);
                position = largest_child;
            } else {
                return;
            }
        }
    }
}
