pub mod estate;
