/// Port and register types for module interconnection

/// A wire/signal that carries data between modules.
/// Every wire carries a valid flag alongside its value.
#[derive(Debug, Clone)]
pub struct Wire<T: Clone> {
  pub value: T,
  pub valid: bool,
}

impl<T: Clone> Wire<T> {
  pub fn new(value: T) -> Self {
    Self { value, valid: false }
  }

  pub fn set(&mut self, value: T) {
    self.value = value;
    self.valid = true;
  }

  pub fn clear(&mut self) {
    self.valid = false;
  }

  /// Value when valid, otherwise `fallback`.
  pub fn get_or(&self, fallback: T) -> T {
    if self.valid {
      self.value.clone()
    } else {
      fallback
    }
  }
}

impl<T: Clone + Default> Default for Wire<T> {
  fn default() -> Self {
    Self {
      value: T::default(),
      valid: false,
    }
  }
}

/// A clocked register.
///
/// `get` always returns the value latched at the last clock edge; `set`
/// only stages the next value, which becomes visible after `commit`.
/// A register that is not written in a cycle holds its value.
#[derive(Debug, Clone)]
pub struct Reg<T: Clone> {
  cur: T,
  next: T,
  init: T,
}

impl<T: Clone> Reg<T> {
  pub fn new(init: T) -> Self {
    Self {
      cur: init.clone(),
      next: init.clone(),
      init,
    }
  }

  pub fn get(&self) -> &T {
    &self.cur
  }

  pub fn set(&mut self, value: T) {
    self.next = value;
  }

  pub fn commit(&mut self) {
    self.cur = self.next.clone();
  }

  pub fn reset(&mut self) {
    self.cur = self.init.clone();
    self.next = self.init.clone();
  }
}

impl<T: Clone + Copy> Reg<T> {
  pub fn value(&self) -> T {
    self.cur
  }
}

impl<T: Clone + Default> Default for Reg<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}
