mod discovery;
mod overrides;
